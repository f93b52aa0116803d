//! Relay Client - 厨房看板 / 点餐端连接中继的客户端库
//!
//! - [`RelayConnection`] WebSocket 会话 (固定间隔重连 + 心跳)
//! - [`RelayHttpClient`] REST 接口
//! - [`Discovery`] 子网内查找中继
//! - [`KitchenBoard`] / [`WaiterOrderBuilder`] 两端的本地状态

pub mod config;
pub mod discovery;
pub mod error;
pub mod http;
pub mod kitchen;
pub mod session;
pub mod waiter;

pub use config::ClientConfig;
pub use discovery::{DiscoveredRelay, Discovery, DiscoveryError, subnet_candidates};
pub use error::{ClientError, ClientResult};
pub use http::RelayHttpClient;
pub use kitchen::{BoardChange, KitchenBoard};
pub use session::{ConnectionEvent, RelayConnection, RelayHandle, RelaySession};
pub use waiter::{WaiterOrderBuilder, WaiterTracker};

// Re-export shared types for convenience
pub use shared::{ClientRole, Envelope, MessageType, Order, OrderStatus};
