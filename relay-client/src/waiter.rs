//! 点餐端
//!
//! [`WaiterOrderBuilder`] 在本地组装订单并生成 `order_new`；
//! [`WaiterTracker`] 跟踪已下的单，根据厨房回报更新状态。

use shared::{AppResult, Envelope, MessageType, Order, OrderItem, OrderType, StatusUpdate};

/// 订单构建器
///
/// ```ignore
/// let (order, envelope) = WaiterOrderBuilder::dine_in(7)
///     .item(OrderItem::new(1, "Ajiaco", 2, 24000.0))
///     .notes("sin alcaparras")
///     .into_envelope()?;
/// handle.send(envelope)?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct WaiterOrderBuilder {
    order_type: OrderType,
    table_number: Option<u32>,
    takeout_number: Option<u32>,
    items: Vec<OrderItem>,
    notes: Option<String>,
}

impl WaiterOrderBuilder {
    pub fn new(order_type: OrderType) -> Self {
        Self {
            order_type,
            ..Default::default()
        }
    }

    /// 堂食
    pub fn dine_in(table_number: u32) -> Self {
        Self::new(OrderType::DineIn).table(table_number)
    }

    /// 外带
    pub fn takeout(takeout_number: u32) -> Self {
        Self::new(OrderType::Takeout).takeout_number(takeout_number)
    }

    pub fn table(mut self, table_number: u32) -> Self {
        self.table_number = Some(table_number);
        self
    }

    pub fn takeout_number(mut self, takeout_number: u32) -> Self {
        self.takeout_number = Some(takeout_number);
        self
    }

    pub fn item(mut self, item: OrderItem) -> Self {
        self.items.push(item);
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// 组装并校验订单 (分配本地 ID)
    pub fn build(self) -> AppResult<Order> {
        let mut order = Order::new(self.order_type, self.items);
        order.table_number = self.table_number;
        order.takeout_number = self.takeout_number;
        order.notes = self.notes;
        order.validate()?;
        Ok(order)
    }

    /// 组装订单并生成 `order_new` 信封
    pub fn into_envelope(self) -> AppResult<(Order, Envelope)> {
        let order = self.build()?;
        let envelope = Envelope::order_new(&order)?;
        Ok((order, envelope))
    }
}

/// 跟踪订单数上限
pub const DEFAULT_TRACKER_LIMIT: usize = 200;

/// 已下订单跟踪
///
/// 超过上限时先丢最早的已完成订单，没有已完成的再丢最早的。
#[derive(Debug, Clone)]
pub struct WaiterTracker {
    orders: Vec<Order>,
    limit: usize,
}

impl Default for WaiterTracker {
    fn default() -> Self {
        Self::with_limit(DEFAULT_TRACKER_LIMIT)
    }
}

impl WaiterTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            orders: Vec::new(),
            limit: limit.max(1),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// 记录本端刚发出的订单
    pub fn track(&mut self, order: Order) {
        if !self.orders.iter().any(|o| o.id == order.id) {
            self.orders.push(order);
            self.evict();
        }
    }

    /// 不再跟踪某个订单
    pub fn remove(&mut self, id: &str) -> Option<Order> {
        let pos = self.orders.iter().position(|o| o.id == id)?;
        Some(self.orders.remove(pos))
    }

    fn evict(&mut self) {
        while self.orders.len() > self.limit {
            let pos = self
                .orders
                .iter()
                .position(|o| o.status == shared::OrderStatus::Completed)
                .unwrap_or(0);
            let dropped = self.orders.remove(pos);
            tracing::debug!(order_id = %dropped.id, "Tracker full, dropping order");
        }
    }

    /// 应用中继推送的消息，返回被更新的订单
    ///
    /// `kitchen_update` 只改状态；`order_update` / `kitchen_order` 覆盖整单。
    pub fn receive(&mut self, envelope: &Envelope) -> AppResult<Option<&Order>> {
        match envelope.message_type {
            MessageType::KitchenUpdate => {
                let StatusUpdate { order_id, status } = envelope.status_update()?;
                let Some(pos) = self.orders.iter().position(|o| o.id == order_id) else {
                    tracing::debug!(order_id = %order_id, "Status for untracked order");
                    return Ok(None);
                };
                let at = if envelope.timestamp > 0 {
                    envelope.timestamp
                } else {
                    shared::util::now_millis()
                };
                self.orders[pos].apply_status(status, at);
                Ok(self.orders.get(pos))
            }
            MessageType::OrderUpdate | MessageType::KitchenOrder => {
                let order = envelope.order()?;
                let pos = match self.orders.iter().position(|o| o.id == order.id) {
                    Some(pos) => {
                        self.orders[pos] = order;
                        pos
                    }
                    None => {
                        let id = order.id.clone();
                        self.orders.push(order);
                        self.evict();
                        return Ok(self.orders.iter().find(|o| o.id == id));
                    }
                };
                Ok(self.orders.get(pos))
            }
            MessageType::OrderNew | MessageType::Heartbeat => Ok(None),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Order> {
        self.orders.iter().find(|o| o.id == id)
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    /// 已出餐待上菜
    pub fn ready(&self) -> impl Iterator<Item = &Order> {
        self.orders
            .iter()
            .filter(|o| o.status == shared::OrderStatus::Ready)
    }
}
