//! 订单簿处理器: 把中继转发的订单消息写入 [`OrderBook`]

use std::sync::Arc;

use async_trait::async_trait;
use shared::{AppError, ErrorCode, MessageType};

use super::book::{OrderBook, Upsert};
use crate::relay::{MessageProcessor, ProcessResult, RelayedMessage};

pub struct OrderBookProcessor {
    book: Arc<OrderBook>,
}

impl OrderBookProcessor {
    pub fn new(book: Arc<OrderBook>) -> Self {
        Self { book }
    }
}

#[async_trait]
impl MessageProcessor for OrderBookProcessor {
    fn name(&self) -> &'static str {
        "order_book"
    }

    fn message_types(&self) -> &'static [MessageType] {
        &[
            MessageType::OrderNew,
            MessageType::KitchenOrder,
            MessageType::OrderUpdate,
            MessageType::KitchenUpdate,
        ]
    }

    async fn process(&self, msg: &RelayedMessage) -> Result<ProcessResult, AppError> {
        let envelope = &msg.envelope;

        if envelope.message_type == MessageType::KitchenUpdate {
            let update = envelope.status_update()?;
            let at = match envelope.timestamp {
                ts if ts > 0 => ts,
                _ => shared::util::now_millis(),
            };
            return match self.book.apply_status(&update.order_id, update.status, at) {
                Ok((_, true)) => Ok(ProcessResult::success(format!(
                    "order {} -> {}",
                    update.order_id, update.status
                ))),
                Ok((_, false)) => Ok(ProcessResult::skipped(format!(
                    "order {} already {}",
                    update.order_id, update.status
                ))),
                // 中继重启后可能收到未知订单的状态
                Err(e) if e.code == ErrorCode::OrderNotFound => Ok(ProcessResult::Failed {
                    reason: e.message,
                }),
                Err(e) => Err(e),
            };
        }

        let order = envelope.order()?;
        let id = order.id.clone();
        let result = match self.book.upsert(order) {
            Upsert::Inserted => format!("order {} stored", id),
            Upsert::Replaced => format!("order {} replaced", id),
        };
        Ok(ProcessResult::success(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{ClientRole, Envelope, Order, OrderItem, OrderStatus, OrderType};

    fn relayed(envelope: Envelope) -> RelayedMessage {
        RelayedMessage {
            connection_id: 1,
            from: ClientRole::Waiter,
            envelope,
        }
    }

    #[tokio::test]
    async fn test_order_new_then_kitchen_update() {
        let book = Arc::new(OrderBook::new(10));
        let processor = OrderBookProcessor::new(book.clone());

        let order = Order::new(OrderType::Delivery, vec![OrderItem::new(2, "Empanada", 3, 2.0)]);
        let result = processor
            .process(&relayed(Envelope::order_new(&order).unwrap()))
            .await
            .unwrap();
        assert!(result.is_success());
        assert_eq!(book.active().len(), 1);

        let update = Envelope::kitchen_update(order.id.clone(), OrderStatus::Completed).unwrap();
        let result = processor.process(&relayed(update.clone())).await.unwrap();
        assert!(result.is_success());
        assert!(book.active().is_empty());
        assert_eq!(book.history()[0].id, order.id);

        // re-application is a no-op
        let result = processor.process(&relayed(update)).await.unwrap();
        assert!(matches!(result, ProcessResult::Skipped { .. }));
    }

    #[tokio::test]
    async fn test_unknown_order_status_is_not_an_error() {
        let book = Arc::new(OrderBook::new(10));
        let processor = OrderBookProcessor::new(book);
        let update = Envelope::kitchen_update("nope", OrderStatus::Ready).unwrap();

        let result = processor.process(&relayed(update)).await.unwrap();
        assert!(matches!(result, ProcessResult::Failed { .. }));
    }

    #[tokio::test]
    async fn test_bad_payload_is_error() {
        let book = Arc::new(OrderBook::new(10));
        let processor = OrderBookProcessor::new(book);
        let env = Envelope::new(MessageType::OrderNew, serde_json::json!({"id": 1}));

        let err = processor.process(&relayed(env)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::MessageMalformed);
    }
}
