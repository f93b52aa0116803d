//! HTTP 请求体
//!
//! POS 通过 `POST /api/orders` 下单时可以只传商品 ID，
//! 名称和单价由服务端的商品目录补全。

use serde::{Deserialize, Serialize};

use super::types::{Modifier, OrderStatus, OrderType};

/// `POST /api/orders` 请求体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub order_type: OrderType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub takeout_number: Option<u32>,
    pub items: Vec<CreateOrderItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// 下单明细
///
/// `name` / `unit_price` 缺省时从商品目录补全。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateOrderItem {
    pub product_id: i64,
    pub quantity: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modifiers: Vec<Modifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<f64>,
}

impl CreateOrderItem {
    pub fn new(product_id: i64, quantity: i32) -> Self {
        Self {
            product_id,
            quantity,
            modifiers: Vec::new(),
            notes: None,
            name: None,
            unit_price: None,
        }
    }
}

/// `POST /api/orders/{id}/status` 请求体
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}
