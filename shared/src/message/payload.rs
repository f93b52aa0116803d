//! 消息载荷定义

use serde::{Deserialize, Serialize};

use crate::order::OrderStatus;

/// `kitchen_update` 载荷: 厨房对某个订单的状态回报
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub order_id: String,
    pub status: OrderStatus,
}
