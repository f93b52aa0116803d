//! 内存订单簿
//!
//! 中继把经过它的订单消息记一份，HTTP 客户端重连后可以直接拉取当前状态
//! 覆盖本地数组。不落盘。
//!
//! - `open`: 未完成的订单 (active / ready)，按到达顺序
//! - `history`: 已完成订单，最新的在前，超过 `history_limit` 丢弃最旧的
//!
//! 厨房出餐后通常不会再发 `completed`，`open` 中的 ready 订单超过
//! `history_limit` 时最早的那些移入 `history`。

use std::collections::VecDeque;

use parking_lot::RwLock;
use shared::{AppError, AppResult, ErrorCode, Order, OrderStatus};

#[derive(Default)]
struct BookInner {
    open: Vec<Order>,
    history: VecDeque<Order>,
}

impl BookInner {
    /// 从 open 或 history 中取出订单
    fn take(&mut self, id: &str) -> Option<Order> {
        if let Some(pos) = self.open.iter().position(|o| o.id == id) {
            return Some(self.open.remove(pos));
        }
        let pos = self.history.iter().position(|o| o.id == id)?;
        self.history.remove(pos)
    }

    fn find(&self, id: &str) -> Option<&Order> {
        self.open
            .iter()
            .chain(self.history.iter())
            .find(|o| o.id == id)
    }

    /// 按状态放回对应的集合
    fn place(&mut self, order: Order, limit: usize) {
        if order.status == OrderStatus::Completed {
            self.push_history(order, limit);
        } else {
            self.open.push(order);
            self.evict_ready(limit);
        }
    }

    fn push_history(&mut self, order: Order, limit: usize) {
        self.history.push_front(order);
        self.history.truncate(limit);
    }

    /// ready 订单超过 `limit` 时把最早的移入历史
    fn evict_ready(&mut self, limit: usize) {
        let mut ready = self
            .open
            .iter()
            .filter(|o| o.status == OrderStatus::Ready)
            .count();
        while ready > limit {
            let Some(pos) = self.open.iter().position(|o| o.status == OrderStatus::Ready) else {
                break;
            };
            let order = self.open.remove(pos);
            self.push_history(order, limit);
            ready -= 1;
        }
    }

    /// 应用状态并按新状态归位，返回更新后的订单和状态是否变化
    fn apply_status(
        &mut self,
        id: &str,
        status: OrderStatus,
        at: i64,
        limit: usize,
    ) -> AppResult<(Order, bool)> {
        if status != OrderStatus::Completed
            && let Some(order) = self.open.iter_mut().find(|o| o.id == id)
        {
            let changed = order.apply_status(status, at);
            let updated = order.clone();
            if changed && status == OrderStatus::Ready {
                self.evict_ready(limit);
            }
            return Ok((updated, changed));
        }
        let mut order = self.take(id).ok_or_else(|| AppError::order_not_found(id))?;
        let changed = order.apply_status(status, at);
        self.place(order.clone(), limit);
        Ok((order, changed))
    }
}

/// upsert 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Replaced,
}

/// 订单簿
pub struct OrderBook {
    inner: RwLock<BookInner>,
    history_limit: usize,
}

impl std::fmt::Debug for OrderBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderBook")
            .field("orders", &self.len())
            .field("history_limit", &self.history_limit)
            .finish()
    }
}

impl OrderBook {
    pub fn new(history_limit: usize) -> Self {
        Self {
            inner: RwLock::new(BookInner::default()),
            history_limit,
        }
    }

    /// 新建订单 (HTTP 下单)
    ///
    /// 订单需通过校验，ID 不能重复。
    pub fn create(&self, order: Order) -> AppResult<Order> {
        order.validate()?;
        let mut inner = self.inner.write();
        if inner.find(&order.id).is_some() {
            return Err(AppError::with_message(
                ErrorCode::AlreadyExists,
                format!("Order {} already exists", order.id),
            ));
        }
        inner.place(order.clone(), self.history_limit);
        Ok(order)
    }

    /// 覆盖写入 (last-writer-wins)
    ///
    /// 同一 ID 的已有订单在原位置被替换；状态变化导致跨集合时按新状态重新放置。
    pub fn upsert(&self, order: Order) -> Upsert {
        let mut inner = self.inner.write();
        let completed = order.status == OrderStatus::Completed;

        if !completed && let Some(slot) = inner.open.iter_mut().find(|o| o.id == order.id) {
            *slot = order;
            inner.evict_ready(self.history_limit);
            return Upsert::Replaced;
        }
        match inner.take(&order.id) {
            Some(_) => {
                inner.place(order, self.history_limit);
                Upsert::Replaced
            }
            None => {
                inner.place(order, self.history_limit);
                Upsert::Inserted
            }
        }
    }

    /// 应用状态 (last-writer-wins, 不检查迁移是否合法)
    ///
    /// 返回更新后的订单和状态是否发生变化。
    pub fn apply_status(&self, id: &str, status: OrderStatus, at: i64) -> AppResult<(Order, bool)> {
        self.inner
            .write()
            .apply_status(id, status, at, self.history_limit)
    }

    /// 带状态机校验的状态变更 (HTTP 改状态)
    ///
    /// 校验和写入在同一把写锁内完成。
    pub fn transition(&self, id: &str, status: OrderStatus, at: i64) -> AppResult<(Order, bool)> {
        let mut inner = self.inner.write();
        let current = inner
            .find(id)
            .map(|o| o.status)
            .ok_or_else(|| AppError::order_not_found(id))?;
        if !current.can_transition_to(status) {
            return Err(AppError::with_message(
                ErrorCode::OrderInvalidTransition,
                format!("Order {} cannot move from {} to {}", id, current, status),
            )
            .with_detail("from", current.to_string())
            .with_detail("to", status.to_string()));
        }
        inner.apply_status(id, status, at, self.history_limit)
    }

    pub fn get(&self, id: &str) -> Option<Order> {
        self.inner.read().find(id).cloned()
    }

    /// 未完成订单, 按到达顺序
    pub fn active(&self) -> Vec<Order> {
        self.inner.read().open.clone()
    }

    /// 已完成订单, 最新的在前
    pub fn history(&self) -> Vec<Order> {
        self.inner.read().history.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        let inner = self.inner.read();
        inner.open.len() + inner.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{OrderItem, OrderType};

    fn order(id: &str) -> Order {
        let mut order = Order::new(OrderType::DineIn, vec![OrderItem::new(1, "Bandeja", 1, 18.0)])
            .with_table(3);
        order.id = id.to_string();
        order
    }

    #[test]
    fn test_create_rejects_invalid_and_duplicate() {
        let book = OrderBook::new(10);
        book.create(order("a")).unwrap();

        let err = book.create(order("a")).unwrap_err();
        assert_eq!(err.code, ErrorCode::AlreadyExists);

        let mut empty = order("b");
        empty.items.clear();
        assert_eq!(book.create(empty).unwrap_err().code, ErrorCode::OrderEmpty);
        assert_eq!(book.len(), 1);
    }

    #[test]
    fn test_upsert_last_writer_wins() {
        let book = OrderBook::new(10);
        assert_eq!(book.upsert(order("a")), Upsert::Inserted);
        assert_eq!(book.upsert(order("b")), Upsert::Inserted);

        let mut edited = order("a");
        edited.notes = Some("no onions".into());
        assert_eq!(book.upsert(edited), Upsert::Replaced);

        let active = book.active();
        // replaced in place, arrival order preserved
        assert_eq!(active[0].id, "a");
        assert_eq!(active[0].notes.as_deref(), Some("no onions"));
        assert_eq!(active[1].id, "b");
    }

    #[test]
    fn test_completed_moves_to_history_and_undo_restores() {
        let book = OrderBook::new(10);
        book.upsert(order("a"));

        let (o, changed) = book.apply_status("a", OrderStatus::Completed, 100).unwrap();
        assert!(changed);
        assert_eq!(o.updated_at, 100);
        assert!(book.active().is_empty());
        assert_eq!(book.history()[0].id, "a");

        // idempotent
        let (_, changed) = book.apply_status("a", OrderStatus::Completed, 200).unwrap();
        assert!(!changed);
        assert_eq!(book.history().len(), 1);

        let (o, changed) = book.apply_status("a", OrderStatus::Active, 300).unwrap();
        assert!(changed);
        assert_eq!(o.items.len(), 1);
        assert_eq!(book.active()[0].id, "a");
        assert!(book.history().is_empty());
    }

    #[test]
    fn test_ready_stays_open_in_place() {
        let book = OrderBook::new(10);
        book.upsert(order("a"));
        book.upsert(order("b"));
        book.apply_status("a", OrderStatus::Ready, 1).unwrap();
        let active = book.active();
        assert_eq!(active[0].id, "a");
        assert_eq!(active[0].status, OrderStatus::Ready);
    }

    #[test]
    fn test_history_is_bounded() {
        let book = OrderBook::new(2);
        for id in ["a", "b", "c"] {
            let mut o = order(id);
            o.status = OrderStatus::Completed;
            book.upsert(o);
        }
        let history: Vec<_> = book.history().into_iter().map(|o| o.id).collect();
        assert_eq!(history, vec!["c", "b"]);
    }

    #[test]
    fn test_transition_checks_state_machine() {
        let book = OrderBook::new(10);
        book.upsert(order("a"));
        book.transition("a", OrderStatus::Ready, 1).unwrap();
        book.transition("a", OrderStatus::Completed, 2).unwrap();

        let err = book.transition("a", OrderStatus::Ready, 3).unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderInvalidTransition);

        let err = book.transition("missing", OrderStatus::Ready, 3).unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderNotFound);
    }

    #[test]
    fn test_transition_never_reopens_concurrently_completed_order() {
        for _ in 0..200 {
            let book = OrderBook::new(10);
            book.upsert(order("a"));

            std::thread::scope(|scope| {
                scope.spawn(|| book.transition("a", OrderStatus::Ready, 1));
                scope.spawn(|| book.apply_status("a", OrderStatus::Completed, 2));
            });

            // either ready then completed, or completed then 409
            let a = book.get("a").unwrap();
            assert_eq!(a.status, OrderStatus::Completed);
            assert!(book.active().is_empty());
        }
    }

    #[test]
    fn test_ready_orders_are_bounded() {
        let book = OrderBook::new(2);
        for id in ["a", "b", "c", "d"] {
            book.upsert(order(id));
        }
        book.upsert(order("e"));
        for (at, id) in ["a", "b", "c", "d"].into_iter().enumerate() {
            book.apply_status(id, OrderStatus::Ready, at as i64).unwrap();
        }

        let open: Vec<_> = book.active().into_iter().map(|o| o.id).collect();
        assert_eq!(open, vec!["c", "d", "e"]);
        let history: Vec<_> = book.history().into_iter().map(|o| o.id).collect();
        assert_eq!(history, vec!["b", "a"]);

        // a ready upsert is bounded the same way
        let mut ready = order("e");
        ready.status = OrderStatus::Ready;
        book.upsert(ready);
        let open: Vec<_> = book.active().into_iter().map(|o| o.id).collect();
        assert_eq!(open, vec!["d", "e"]);
    }
}
