//! Client configuration

use std::time::Duration;

use shared::ClientRole;

/// 默认中继端口
pub const DEFAULT_PORT: u16 = 8080;

/// Client configuration for connecting to the relay
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Relay host (IP or hostname)
    pub host: String,

    /// Relay HTTP / WebSocket port
    pub port: u16,

    /// Role announced in `/ws?type=`
    pub role: ClientRole,

    /// Fixed delay between reconnect attempts
    pub reconnect_delay: Duration,

    /// Interval between `heartbeat` envelopes
    pub heartbeat_interval: Duration,

    /// HTTP request timeout
    pub timeout: Duration,

    /// Outbound queue length while connected or reconnecting
    pub outbound_capacity: usize,
}

impl ClientConfig {
    /// Create a new configuration for the given relay host
    pub fn new(host: impl Into<String>, role: ClientRole) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            role,
            reconnect_delay: Duration::from_secs(3),
            heartbeat_interval: Duration::from_secs(15),
            timeout: Duration::from_secs(10),
            outbound_capacity: 64,
        }
    }

    /// Kitchen display configuration
    pub fn kitchen(host: impl Into<String>) -> Self {
        Self::new(host, ClientRole::Kitchen)
    }

    /// Waiter app configuration
    pub fn waiter(host: impl Into<String>) -> Self {
        Self::new(host, ClientRole::Waiter)
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_outbound_capacity(mut self, capacity: usize) -> Self {
        self.outbound_capacity = capacity.max(1);
        self
    }

    /// `http://host:port`
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// `ws://host:port/ws?type=role`
    pub fn ws_url(&self) -> String {
        format!("ws://{}:{}/ws?type={}", self.host, self.port, self.role)
    }
}
