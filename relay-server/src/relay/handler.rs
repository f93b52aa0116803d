//! Message Handler
//!
//! 后台订阅中继的监听通道，把每条已转发的消息分发给注册的处理器。

use std::collections::HashMap;
use std::sync::Arc;

use shared::MessageType;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use super::hub::RelayedMessage;
use super::processor::{MessageProcessor, ProcessResult};

pub struct MessageHandler {
    receiver: broadcast::Receiver<RelayedMessage>,
    processors: HashMap<MessageType, Vec<Arc<dyn MessageProcessor>>>,
}

impl MessageHandler {
    pub fn new(receiver: broadcast::Receiver<RelayedMessage>) -> Self {
        Self {
            receiver,
            processors: HashMap::new(),
        }
    }

    /// 注册处理器 (按其声明的消息类型)
    pub fn register_processor(mut self, processor: Arc<dyn MessageProcessor>) -> Self {
        for message_type in processor.message_types() {
            self.processors
                .entry(*message_type)
                .or_default()
                .push(processor.clone());
        }
        self
    }

    /// 运行直到取消或通道关闭
    pub async fn run(mut self, shutdown: CancellationToken) {
        tracing::info!("Message handler started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Message handler shutting down");
                    break;
                }

                msg_result = self.receiver.recv() => {
                    match msg_result {
                        Ok(msg) => self.handle_message(&msg).await,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!("Message handler lagged, skipped {} messages", skipped);
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            tracing::info!("Message channel closed");
                            break;
                        }
                    }
                }
            }
        }

        tracing::info!("Message handler stopped");
    }

    async fn handle_message(&self, msg: &RelayedMessage) {
        let message_type = msg.envelope.message_type;
        let Some(processors) = self.processors.get(&message_type) else {
            return;
        };

        for processor in processors {
            match processor.process(msg).await {
                Ok(ProcessResult::Success { message }) => {
                    tracing::debug!(
                        processor = processor.name(),
                        message_type = %message_type,
                        result = %message,
                        "Message processed"
                    );
                }
                Ok(ProcessResult::Skipped { reason }) => {
                    tracing::debug!(
                        processor = processor.name(),
                        message_type = %message_type,
                        reason = %reason,
                        "Message skipped"
                    );
                }
                Ok(ProcessResult::Failed { reason }) => {
                    tracing::warn!(
                        processor = processor.name(),
                        message_type = %message_type,
                        reason = %reason,
                        "Message processing failed"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        processor = processor.name(),
                        message_type = %message_type,
                        error = %e,
                        "Message processing error"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::Relay;
    use async_trait::async_trait;
    use shared::{AppError, ClientRole, Envelope};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Counter(AtomicUsize);

    #[async_trait]
    impl MessageProcessor for Counter {
        fn name(&self) -> &'static str {
            "counter"
        }

        fn message_types(&self) -> &'static [MessageType] {
            &[MessageType::KitchenUpdate]
        }

        async fn process(&self, _msg: &RelayedMessage) -> Result<ProcessResult, AppError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(ProcessResult::success("counted"))
        }
    }

    #[tokio::test]
    async fn test_dispatch_by_message_type() {
        let relay = Relay::new(8);
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        let handler = MessageHandler::new(relay.subscribe()).register_processor(counter.clone());
        let token = CancellationToken::new();
        let task = tokio::spawn(handler.run(token.clone()));

        let update = Envelope::kitchen_update("1", shared::OrderStatus::Ready).unwrap();
        relay.publish(RelayedMessage {
            connection_id: 1,
            from: ClientRole::Kitchen,
            envelope: update,
        });
        relay.publish(RelayedMessage {
            connection_id: 1,
            from: ClientRole::Kitchen,
            envelope: Envelope::heartbeat(),
        });

        tokio::time::timeout(Duration::from_secs(2), async {
            while counter.0.load(Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        token.cancel();
        task.await.unwrap();
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }
}
