//! 子网发现
//!
//! 客户端不知道中继地址时，对本机所在 /24 网段的每个主机并发请求
//! `GET http://{ip}:{port}/health`，第一个返回健康响应的即为中继。
//! 整个扫描受固定时间窗口约束。

use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
use std::time::Duration;

use futures::StreamExt;
use futures::stream;
use reqwest::Client;
use shared::{ErrorCode, HealthResponse};
use thiserror::Error;

use crate::{ClientError, ClientResult};

/// 单个主机的探测超时
const DEFAULT_HOST_TIMEOUT: Duration = Duration::from_millis(800);
/// 整个扫描的时间窗口
const DEFAULT_SCAN_WINDOW: Duration = Duration::from_secs(10);
/// 并发探测数
const DEFAULT_CONCURRENCY: usize = 32;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("No relay found on {scanned} candidate hosts")]
    NotFound { scanned: usize },

    #[error("Cannot determine local IPv4 address: {0}")]
    NoLocalAddress(String),

    #[error(transparent)]
    Client(#[from] ClientError),
}

impl DiscoveryError {
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            DiscoveryError::NotFound { .. } => Some(ErrorCode::RelayNotFound),
            DiscoveryError::NoLocalAddress(_) => None,
            DiscoveryError::Client(e) => e.code(),
        }
    }
}

/// 发现结果
#[derive(Debug, Clone)]
pub struct DiscoveredRelay {
    pub addr: SocketAddr,
    pub health: HealthResponse,
}

/// `ip` 所在 /24 网段的全部主机地址 (.1 ~ .254)
pub fn subnet_candidates(ip: Ipv4Addr) -> Vec<Ipv4Addr> {
    let [a, b, c, _] = ip.octets();
    (1..=254).map(|d| Ipv4Addr::new(a, b, c, d)).collect()
}

/// 本机出口 IPv4 地址
///
/// UDP connect 不发送数据，只让系统选择路由。
pub fn local_ipv4() -> Result<Ipv4Addr, DiscoveryError> {
    let socket =
        UdpSocket::bind("0.0.0.0:0").map_err(|e| DiscoveryError::NoLocalAddress(e.to_string()))?;
    socket
        .connect("8.8.8.8:80")
        .map_err(|e| DiscoveryError::NoLocalAddress(e.to_string()))?;
    match socket.local_addr() {
        Ok(SocketAddr::V4(addr)) if !addr.ip().is_unspecified() => Ok(*addr.ip()),
        Ok(other) => Err(DiscoveryError::NoLocalAddress(format!(
            "unexpected local address {other}"
        ))),
        Err(e) => Err(DiscoveryError::NoLocalAddress(e.to_string())),
    }
}

/// 中继发现器
#[derive(Debug, Clone)]
pub struct Discovery {
    port: u16,
    host_timeout: Duration,
    scan_window: Duration,
    concurrency: usize,
    client: Client,
}

impl Discovery {
    /// 默认超时: 单个探测 800ms, 整个扫描 10s
    pub fn new(port: u16) -> ClientResult<Self> {
        Self::with_timeouts(port, DEFAULT_HOST_TIMEOUT, DEFAULT_SCAN_WINDOW)
    }

    pub fn with_timeouts(
        port: u16,
        host_timeout: Duration,
        scan_window: Duration,
    ) -> ClientResult<Self> {
        let client = Client::builder().timeout(host_timeout).build()?;
        Ok(Self {
            port,
            host_timeout,
            scan_window,
            concurrency: DEFAULT_CONCURRENCY,
            client,
        })
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn host_timeout(&self) -> Duration {
        self.host_timeout
    }

    /// 探测单个主机
    ///
    /// 只有 2xx 且能解析为 `HealthResponse` 的响应才算中继。
    pub async fn check_host(&self, ip: Ipv4Addr) -> Option<DiscoveredRelay> {
        let addr = SocketAddr::new(IpAddr::V4(ip), self.port);
        let response = self
            .client
            .get(format!("http://{}/health", addr))
            .send()
            .await
            .ok()?;
        if !response.status().is_success() {
            return None;
        }
        let health: HealthResponse = response.json().await.ok()?;
        if !health.is_ok() {
            tracing::debug!(%addr, status = %health.status, "Relay answered but is not healthy");
            return None;
        }
        Some(DiscoveredRelay { addr, health })
    }

    /// 并发扫描候选地址，返回第一个命中的中继
    pub async fn scan(&self, candidates: Vec<Ipv4Addr>) -> Result<DiscoveredRelay, DiscoveryError> {
        let scanned = candidates.len();
        tracing::info!(
            candidates = scanned,
            port = self.port,
            window_ms = self.scan_window.as_millis() as u64,
            "Scanning for relay"
        );

        let mut checks = stream::iter(candidates)
            .map(|ip| self.check_host(ip))
            .buffer_unordered(self.concurrency);

        let search = async {
            while let Some(result) = checks.next().await {
                if let Some(found) = result {
                    return Some(found);
                }
            }
            None
        };

        match tokio::time::timeout(self.scan_window, search).await {
            Ok(Some(found)) => {
                tracing::info!(addr = %found.addr, version = %found.health.version, "Relay discovered");
                Ok(found)
            }
            Ok(None) => Err(DiscoveryError::NotFound { scanned }),
            Err(_) => {
                tracing::warn!("Relay scan window elapsed");
                Err(DiscoveryError::NotFound { scanned })
            }
        }
    }

    /// 扫描本机所在网段
    pub async fn discover(&self) -> Result<DiscoveredRelay, DiscoveryError> {
        let ip = local_ipv4()?;
        self.scan(subnet_candidates(ip)).await
    }
}
