//! WebSocket 中继
//!
//! 按角色 (`kitchen` / `waiter`) 标记连接，把客户端消息原样转发给互补角色。
//!
//! - [`hub`] - 连接表与扇出
//! - [`connection`] - 单连接读写循环、心跳、空闲断开
//! - [`processor`] / [`handler`] - 转发消息的旁路处理 (订单簿)

pub mod connection;
pub mod handler;
pub mod hub;
pub mod processor;

pub use connection::{ConnectionSettings, FrameOutcome, handle_text, run_connection};
pub use handler::MessageHandler;
pub use hub::{ConnectionId, ConnectionInfo, Relay, RelayedMessage};
pub use processor::{MessageProcessor, ProcessResult};
