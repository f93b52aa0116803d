use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// 中继服务器配置
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | /var/lib/pos/relay | 工作目录 |
/// | HTTP_PORT | 8080 | HTTP / WebSocket 端口 |
/// | BIND_ADDR | 0.0.0.0 | 监听地址 |
/// | ENVIRONMENT | development | 运行环境 |
/// | LOG_LEVEL | info | 日志级别 (RUST_LOG 优先) |
/// | LOG_JSON | false | JSON 格式日志 |
/// | LOG_DIR | - | 日志目录 (按天滚动) |
/// | PRODUCTS_FILE | - | 商品目录 JSON 文件 |
/// | CONNECTION_QUEUE_CAPACITY | 256 | 每个连接的发送队列长度 |
/// | WS_PING_INTERVAL_SECS | 30 | WebSocket ping 间隔 |
/// | WS_IDLE_TIMEOUT_SECS | 90 | 无任何帧多久后断开 |
/// | HISTORY_LIMIT | 200 | 已完成订单保留数量 |
/// | SHUTDOWN_TIMEOUT_MS | 10000 | 关闭超时(毫秒) |
///
/// # 示例
///
/// ```ignore
/// HTTP_PORT=9000 PRODUCTS_FILE=./products.json cargo run -p relay-server
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存放日志等文件
    pub work_dir: String,
    /// HTTP / WebSocket 服务端口
    pub http_port: u16,
    /// 监听地址
    pub bind_addr: String,
    /// 运行环境: development | staging | production
    pub environment: String,
    pub log_level: String,
    pub log_json: bool,
    pub log_dir: Option<String>,
    /// 商品目录文件 (JSON 数组)
    pub products_file: Option<PathBuf>,
    /// 每个连接的发送队列长度, 满了直接丢弃
    pub connection_queue_capacity: usize,
    pub ws_ping_interval_secs: u64,
    pub ws_idle_timeout_secs: u64,
    /// 历史订单保留数量
    pub history_limit: usize,
    /// 关闭超时时间 (毫秒)
    pub shutdown_timeout_ms: u64,
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/pos/relay".into()),
            http_port: env_or("HTTP_PORT", 8080),
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0".into()),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_json: env_or("LOG_JSON", false),
            log_dir: std::env::var("LOG_DIR").ok().filter(|s| !s.is_empty()),
            products_file: std::env::var("PRODUCTS_FILE")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            connection_queue_capacity: env_or("CONNECTION_QUEUE_CAPACITY", 256),
            ws_ping_interval_secs: env_or("WS_PING_INTERVAL_SECS", 30),
            ws_idle_timeout_secs: env_or("WS_IDLE_TIMEOUT_SECS", 90),
            history_limit: env_or("HISTORY_LIMIT", 200),
            shutdown_timeout_ms: env_or("SHUTDOWN_TIMEOUT_MS", 10000),
        }
    }

    /// 使用自定义值覆盖部分配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config
    }

    /// 监听地址; BIND_ADDR 无法解析时退回 0.0.0.0
    pub fn socket_addr(&self) -> SocketAddr {
        let ip = self
            .bind_addr
            .parse()
            .unwrap_or(std::net::IpAddr::from([0, 0, 0, 0]));
        SocketAddr::new(ip, self.http_port)
    }

    pub fn ws_ping_interval(&self) -> Duration {
        Duration::from_secs(self.ws_ping_interval_secs.max(1))
    }

    pub fn ws_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.ws_idle_timeout_secs.max(1))
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
