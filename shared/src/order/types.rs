//! Order model shared by the relay, the kitchen display and the waiter app

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::util::{now_millis, snowflake_id};

// ============================================================================
// Order Type
// ============================================================================

/// 订单类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OrderType {
    /// 堂食
    #[default]
    DineIn,
    /// 外带
    Takeout,
    /// 外卖
    Delivery,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderType::DineIn => write!(f, "dine-in"),
            OrderType::Takeout => write!(f, "takeout"),
            OrderType::Delivery => write!(f, "delivery"),
        }
    }
}

// ============================================================================
// Order Status
// ============================================================================

/// 订单生命周期状态
///
/// ```text
///            mark_ready           complete
///   active ────────────▶ ready ────────────▶ completed
///     ▲  │                 │                    │
///     │  └──── complete ───┼────────────────────┘
///     │                    │                    │
///     └──────── undo ──────┴──────── undo ──────┘
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// 厨房待处理
    #[default]
    Active,
    /// 出餐完成 (从厨房看板移除)
    Ready,
    /// 已完成 (进入历史)
    Completed,
}

impl OrderStatus {
    /// 状态机允许的迁移
    ///
    /// 相同状态视为合法的空操作。
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Active, Active)
                | (Ready, Ready)
                | (Completed, Completed)
                | (Active, Ready)
                | (Active, Completed)
                | (Ready, Completed)
                | (Ready, Active)
                | (Completed, Active)
        )
    }

    /// 是否仍显示在厨房看板上
    pub fn is_active(self) -> bool {
        matches!(self, OrderStatus::Active)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Active => write!(f, "active"),
            OrderStatus::Ready => write!(f, "ready"),
            OrderStatus::Completed => write!(f, "completed"),
        }
    }
}

// ============================================================================
// Items
// ============================================================================

/// 商品加料/做法 (名称 + 差价)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Modifier {
    pub name: String,
    /// 差价, 可以为负 (例如 "去芝士")
    #[serde(default)]
    pub price_delta: f64,
}

impl Modifier {
    pub fn new(name: impl Into<String>, price_delta: f64) -> Self {
        Self {
            name: name.into(),
            price_delta,
        }
    }
}

/// 订单明细
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    /// 商品引用
    pub product_id: i64,
    /// 商品名称 (下单时快照)
    pub name: String,
    pub quantity: i32,
    /// 单价 (下单时快照)
    #[serde(default)]
    pub unit_price: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modifiers: Vec<Modifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl OrderItem {
    pub fn new(product_id: i64, name: impl Into<String>, quantity: i32, unit_price: f64) -> Self {
        Self {
            product_id,
            name: name.into(),
            quantity,
            unit_price,
            modifiers: Vec::new(),
            notes: None,
        }
    }

    pub fn with_modifier(mut self, modifier: Modifier) -> Self {
        self.modifiers.push(modifier);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

// ============================================================================
// Order
// ============================================================================

/// 订单
///
/// 订单的显示状态只取决于最后收到的状态消息 (last-writer-wins)，
/// 不做并发编辑合并。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    /// 本地生成的订单标识
    pub id: String,
    pub order_type: OrderType,
    /// 桌号 (堂食)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_number: Option<u32>,
    /// 取餐号 (外带/外卖)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub takeout_number: Option<u32>,
    pub items: Vec<OrderItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// 创建时间 (毫秒)
    pub created_at: i64,
    #[serde(default)]
    pub status: OrderStatus,
    /// 最后一次状态变更时间 (毫秒)
    #[serde(default)]
    pub updated_at: i64,
}

impl Order {
    /// 创建新订单, 分配本地 ID
    pub fn new(order_type: OrderType, items: Vec<OrderItem>) -> Self {
        let now = now_millis();
        Self {
            id: snowflake_id().to_string(),
            order_type,
            table_number: None,
            takeout_number: None,
            items,
            notes: None,
            created_at: now,
            status: OrderStatus::Active,
            updated_at: now,
        }
    }

    pub fn with_table(mut self, table_number: u32) -> Self {
        self.table_number = Some(table_number);
        self
    }

    pub fn with_takeout_number(mut self, takeout_number: u32) -> Self {
        self.takeout_number = Some(takeout_number);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// 应用状态 (last-writer-wins)
    ///
    /// 返回状态是否发生变化; 重复应用相同状态返回 `false`。
    pub fn apply_status(&mut self, status: OrderStatus, at: i64) -> bool {
        if self.status == status {
            return false;
        }
        self.status = status;
        self.updated_at = at;
        true
    }

    /// 看板显示用的标签: 桌号或取餐号
    pub fn display_label(&self) -> String {
        match (self.order_type, self.table_number, self.takeout_number) {
            (OrderType::DineIn, Some(t), _) => format!("Table {}", t),
            (_, _, Some(n)) => format!("#{}", n),
            _ => format!("#{}", self.id),
        }
    }

    /// 商品总件数
    pub fn item_count(&self) -> i32 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}
