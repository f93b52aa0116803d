//! 订单簿
//!
//! - [`book`] - 内存订单簿 (未完成 + 有界历史)
//! - [`processor`] - 从中继转发的消息更新订单簿

pub mod book;
pub mod processor;

pub use book::{OrderBook, Upsert};
pub use processor::OrderBookProcessor;
