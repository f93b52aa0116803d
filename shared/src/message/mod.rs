//! WebSocket 消息类型定义
//!
//! 这些类型在 relay-server 和 clients (厨房看板、点餐端) 之间共享。
//! 线上格式是简单的 JSON 信封:
//!
//! ```json
//! { "type": "kitchen_order", "timestamp": 1700000000000, "data": { ... } }
//! ```
//!
//! 中继按连接角色转发: 来自 `waiter` 的消息发给所有 `kitchen`，反之亦然。

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{AppError, ErrorCode};
use crate::order::{Order, OrderStatus};
use crate::util::now_millis;

pub mod payload;
pub use payload::StatusUpdate;

// ============================================================================
// Client Role
// ============================================================================

/// 连接角色 (`/ws?type=kitchen|waiter`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientRole {
    /// 厨房看板
    Kitchen,
    /// 点餐端
    Waiter,
}

impl ClientRole {
    /// 互补角色: 消息转发的目标
    pub fn complement(self) -> Self {
        match self {
            ClientRole::Kitchen => ClientRole::Waiter,
            ClientRole::Waiter => ClientRole::Kitchen,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ClientRole::Kitchen => "kitchen",
            ClientRole::Waiter => "waiter",
        }
    }
}

impl fmt::Display for ClientRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClientRole {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kitchen" => Ok(ClientRole::Kitchen),
            "waiter" => Ok(ClientRole::Waiter),
            other => Err(AppError::with_message(
                ErrorCode::InvalidClientRole,
                format!("Unknown client type '{}', expected kitchen or waiter", other),
            )),
        }
    }
}

// ============================================================================
// Message Type
// ============================================================================

/// 信封中的消息类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    /// POS 下发给厨房的新订单
    KitchenOrder,
    /// 订单内容或状态更新 (覆盖式)
    OrderUpdate,
    /// 厨房回报的状态变更
    KitchenUpdate,
    /// 点餐端创建的新订单
    OrderNew,
    /// 心跳, 只由中继应答, 不转发
    Heartbeat,
}

impl MessageType {
    /// 是否需要转发给互补角色
    pub fn is_forwarded(self) -> bool {
        !matches!(self, MessageType::Heartbeat)
    }

    /// 路由规则: 来自 `from` 的消息应转发给哪个角色
    ///
    /// 心跳由中继直接应答，返回 `None`。
    pub fn route_from(self, from: ClientRole) -> Option<ClientRole> {
        self.is_forwarded().then(|| from.complement())
    }

    /// 载荷是否为完整订单
    pub fn carries_order(self) -> bool {
        matches!(
            self,
            MessageType::KitchenOrder | MessageType::OrderUpdate | MessageType::OrderNew
        )
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MessageType::KitchenOrder => "kitchen_order",
            MessageType::OrderUpdate => "order_update",
            MessageType::KitchenUpdate => "kitchen_update",
            MessageType::OrderNew => "order_new",
            MessageType::Heartbeat => "heartbeat",
        };
        f.write_str(s)
    }
}

// ============================================================================
// Envelope
// ============================================================================

/// 消息信封 `{type, timestamp, data}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub message_type: MessageType,
    /// 发送时间 (毫秒)
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl Envelope {
    pub fn new(message_type: MessageType, data: serde_json::Value) -> Self {
        Self {
            message_type,
            timestamp: now_millis(),
            data,
        }
    }

    fn with_payload<T: Serialize>(message_type: MessageType, payload: &T) -> Result<Self, AppError> {
        let data = serde_json::to_value(payload)
            .map_err(|e| AppError::internal(format!("Failed to serialize {}: {}", message_type, e)))?;
        Ok(Self::new(message_type, data))
    }

    /// POS → 厨房: 新订单
    pub fn kitchen_order(order: &Order) -> Result<Self, AppError> {
        Self::with_payload(MessageType::KitchenOrder, order)
    }

    /// 点餐端 → 厨房: 新订单
    pub fn order_new(order: &Order) -> Result<Self, AppError> {
        Self::with_payload(MessageType::OrderNew, order)
    }

    /// 订单覆盖更新
    pub fn order_update(order: &Order) -> Result<Self, AppError> {
        Self::with_payload(MessageType::OrderUpdate, order)
    }

    /// 厨房 → 点餐端: 状态变更
    pub fn kitchen_update(order_id: impl Into<String>, status: OrderStatus) -> Result<Self, AppError> {
        Self::with_payload(
            MessageType::KitchenUpdate,
            &StatusUpdate {
                order_id: order_id.into(),
                status,
            },
        )
    }

    pub fn heartbeat() -> Self {
        Self::new(MessageType::Heartbeat, serde_json::Value::Null)
    }

    /// 解析 data 为指定类型
    pub fn parse_data<T: DeserializeOwned>(&self) -> Result<T, AppError> {
        T::deserialize(&self.data).map_err(|e| {
            AppError::with_message(
                ErrorCode::MessageMalformed,
                format!("Invalid {} payload: {}", self.message_type, e),
            )
        })
    }

    /// 解析订单载荷 (kitchen_order / order_new / order_update)
    pub fn order(&self) -> Result<Order, AppError> {
        if !self.message_type.carries_order() {
            return Err(AppError::with_message(
                ErrorCode::MessageMalformed,
                format!("{} does not carry an order", self.message_type),
            ));
        }
        self.parse_data()
    }

    /// 解析状态载荷 (kitchen_update)
    pub fn status_update(&self) -> Result<StatusUpdate, AppError> {
        if self.message_type != MessageType::KitchenUpdate {
            return Err(AppError::with_message(
                ErrorCode::MessageMalformed,
                format!("{} does not carry a status update", self.message_type),
            ));
        }
        self.parse_data()
    }

    pub fn to_json(&self) -> Result<String, AppError> {
        serde_json::to_string(self)
            .map_err(|e| AppError::internal(format!("Failed to serialize envelope: {}", e)))
    }

    pub fn from_json(text: &str) -> Result<Self, AppError> {
        serde_json::from_str(text).map_err(|e| {
            AppError::with_message(ErrorCode::MessageMalformed, format!("Invalid envelope: {}", e))
        })
    }
}
