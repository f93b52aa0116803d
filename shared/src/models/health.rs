//! Health Model

use serde::{Deserialize, Serialize};

/// `GET /health` 响应
///
/// 子网发现时客户端用它判断目标主机是否为中继。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    /// ok | error
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub connections: ConnectionCounts,
}

impl HealthResponse {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// 按角色统计的在线连接数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionCounts {
    pub kitchen: usize,
    pub waiter: usize,
}

impl ConnectionCounts {
    pub fn total(&self) -> usize {
        self.kitchen + self.waiter
    }
}
