//! Message Processor Trait
//!
//! 中继转发的消息可以被后台处理器旁路消费 (例如订单簿)。
//! 处理器不影响转发本身：失败只记录日志。

use async_trait::async_trait;
use shared::{AppError, MessageType};

use super::hub::RelayedMessage;

/// 处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessResult {
    /// 处理成功
    Success { message: String },
    /// 跳过 (例如状态未变化)
    Skipped { reason: String },
    /// 处理失败, 不重试
    Failed { reason: String },
}

impl ProcessResult {
    pub fn success(message: impl Into<String>) -> Self {
        ProcessResult::Success {
            message: message.into(),
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        ProcessResult::Skipped {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ProcessResult::Success { .. })
    }
}

/// Message Processor trait
#[async_trait]
pub trait MessageProcessor: Send + Sync {
    /// 处理器名称 (用于日志)
    fn name(&self) -> &'static str;

    /// 关心的消息类型
    fn message_types(&self) -> &'static [MessageType];

    async fn process(&self, msg: &RelayedMessage) -> Result<ProcessResult, AppError>;
}
