//! 厨房看板状态
//!
//! - `active`: 待出餐订单，按到达顺序
//! - `history`: 已出餐 / 已完成订单，最新的在前，超出 `history_limit` 丢弃最旧的
//!
//! 看板只维护本地数组；状态回报通过返回的 `kitchen_update` 信封由调用方发送。

use std::collections::VecDeque;

use shared::util::now_millis;
use shared::{AppResult, Envelope, MessageType, Order, OrderStatus};

/// 默认历史长度
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// `receive` 对看板的影响
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardChange {
    /// 新订单进入 active
    Added(String),
    /// 已有订单被覆盖
    Updated(String),
    /// 重复订单或无关消息
    Ignored,
}

/// 厨房看板
#[derive(Debug, Clone)]
pub struct KitchenBoard {
    active: Vec<Order>,
    history: VecDeque<Order>,
    history_limit: usize,
}

impl Default for KitchenBoard {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl KitchenBoard {
    pub fn new(history_limit: usize) -> Self {
        Self {
            active: Vec::new(),
            history: VecDeque::new(),
            history_limit: history_limit.max(1),
        }
    }

    /// 处理中继推送的消息
    ///
    /// 载荷无法解析时返回错误，看板不变。
    pub fn receive(&mut self, envelope: &Envelope) -> AppResult<BoardChange> {
        match envelope.message_type {
            MessageType::KitchenOrder | MessageType::OrderNew => {
                let order = envelope.order()?;
                if self.contains(&order.id) {
                    tracing::debug!(order_id = %order.id, "Duplicate order ignored");
                    return Ok(BoardChange::Ignored);
                }
                let id = order.id.clone();
                self.place(order);
                Ok(BoardChange::Added(id))
            }
            MessageType::OrderUpdate => {
                let order = envelope.order()?;
                let id = order.id.clone();
                let existed = self.take(&id).is_some();
                self.place(order);
                Ok(if existed {
                    BoardChange::Updated(id)
                } else {
                    BoardChange::Added(id)
                })
            }
            MessageType::KitchenUpdate | MessageType::Heartbeat => Ok(BoardChange::Ignored),
        }
    }

    /// 出餐: active → history (ready)
    ///
    /// 订单不在 active 中时返回 `None`，重复调用无副作用。
    pub fn mark_ready(&mut self, id: &str) -> AppResult<Option<Envelope>> {
        let Some(pos) = self.active.iter().position(|o| o.id == id) else {
            return Ok(None);
        };
        let envelope = Envelope::kitchen_update(id, OrderStatus::Ready)?;
        let mut order = self.active.remove(pos);
        order.apply_status(OrderStatus::Ready, now_millis());
        self.push_history(order);
        Ok(Some(envelope))
    }

    /// 完成: active 或 ready → history (completed)
    pub fn complete(&mut self, id: &str) -> AppResult<Option<Envelope>> {
        match self.find(id) {
            Some(order) if order.status != OrderStatus::Completed => {}
            _ => return Ok(None),
        }
        let envelope = Envelope::kitchen_update(id, OrderStatus::Completed)?;
        if let Some(mut order) = self.take(id) {
            order.apply_status(OrderStatus::Completed, now_millis());
            self.push_history(order);
        }
        Ok(Some(envelope))
    }

    /// 撤销: history → active, 明细保持不变
    pub fn undo(&mut self, id: &str) -> AppResult<Option<Envelope>> {
        let Some(pos) = self.history.iter().position(|o| o.id == id) else {
            return Ok(None);
        };
        let envelope = Envelope::kitchen_update(id, OrderStatus::Active)?;
        if let Some(mut order) = self.history.remove(pos) {
            order.apply_status(OrderStatus::Active, now_millis());
            self.active.push(order);
        }
        Ok(Some(envelope))
    }

    /// 重新拉取后覆盖本地 active
    pub fn replace_active(&mut self, orders: Vec<Order>) {
        self.active = orders
            .into_iter()
            .filter(|o| o.status.is_active())
            .collect();
        let active = &self.active;
        self.history.retain(|h| !active.iter().any(|o| o.id == h.id));
    }

    pub fn active(&self) -> &[Order] {
        &self.active
    }

    pub fn history(&self) -> impl Iterator<Item = &Order> {
        self.history.iter()
    }

    pub fn find(&self, id: &str) -> Option<&Order> {
        self.active
            .iter()
            .chain(self.history.iter())
            .find(|o| o.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    fn take(&mut self, id: &str) -> Option<Order> {
        if let Some(pos) = self.active.iter().position(|o| o.id == id) {
            return Some(self.active.remove(pos));
        }
        let pos = self.history.iter().position(|o| o.id == id)?;
        self.history.remove(pos)
    }

    /// 按状态放置: active 进看板, 其余进历史
    fn place(&mut self, order: Order) {
        if order.status.is_active() {
            self.active.push(order);
        } else {
            self.push_history(order);
        }
    }

    fn push_history(&mut self, order: Order) {
        self.history.push_front(order);
        self.history.truncate(self.history_limit);
    }
}
