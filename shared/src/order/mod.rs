//! 订单模型
//!
//! - [`types`] - 订单、明细、加料、状态机
//! - [`money`] - 金额计算 (rust_decimal) 与订单校验
//! - [`request`] - HTTP 下单/改状态请求体

pub mod money;
pub mod request;
pub mod types;

pub use money::{validate_item, validate_order};
pub use request::{CreateOrderItem, CreateOrderRequest, UpdateStatusRequest};
pub use types::{Modifier, Order, OrderItem, OrderStatus, OrderType};
