//! 中继连接表
//!
//! 每个 WebSocket 连接注册一个有界发送队列，由该连接的写任务独占消费。
//! 转发只做 `try_send`：队列满或已关闭时丢弃这一条 (at-most-once)，
//! 不重试也不回执。

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde::Serialize;
use shared::{AppResult, ClientRole, ConnectionCounts, Envelope};
use tokio::sync::{broadcast, mpsc};

/// 连接 ID (进程内递增)
pub type ConnectionId = u64;

/// 订单簿监听通道容量
const TAP_CAPACITY: usize = 1024;

/// 中继转发过的一条消息 (供订单簿等后台监听者消费)
#[derive(Debug, Clone)]
pub struct RelayedMessage {
    pub connection_id: ConnectionId,
    pub from: ClientRole,
    pub envelope: Envelope,
}

/// 连接快照
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionInfo {
    pub id: ConnectionId,
    pub role: ClientRole,
    pub addr: SocketAddr,
    /// 连接时间 (毫秒)
    pub connected_at: i64,
}

struct ConnectionEntry {
    info: ConnectionInfo,
    tx: mpsc::Sender<String>,
}

/// 投递结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    Queued,
    Dropped,
}

struct RelayInner {
    connections: DashMap<ConnectionId, ConnectionEntry>,
    next_id: AtomicU64,
    queue_capacity: usize,
    tap: broadcast::Sender<RelayedMessage>,
}

/// 中继 Hub
///
/// 使用 Arc 实现浅拷贝，HTTP 处理器和各连接任务共享同一个实例。
#[derive(Clone)]
pub struct Relay {
    inner: Arc<RelayInner>,
}

impl std::fmt::Debug for Relay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Relay")
            .field("connections", &self.inner.connections.len())
            .field("queue_capacity", &self.inner.queue_capacity)
            .finish()
    }
}

impl Relay {
    pub fn new(queue_capacity: usize) -> Self {
        let (tap, _) = broadcast::channel(TAP_CAPACITY);
        Self {
            inner: Arc::new(RelayInner {
                connections: DashMap::new(),
                next_id: AtomicU64::new(1),
                queue_capacity: queue_capacity.max(1),
                tap,
            }),
        }
    }

    /// 注册连接，返回连接 ID 和该连接的发送队列
    pub fn register(
        &self,
        role: ClientRole,
        addr: SocketAddr,
    ) -> (ConnectionId, mpsc::Receiver<String>) {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.inner.queue_capacity);
        let info = ConnectionInfo {
            id,
            role,
            addr,
            connected_at: shared::util::now_millis(),
        };
        self.inner.connections.insert(id, ConnectionEntry { info, tx });
        tracing::info!(connection_id = id, role = %role, addr = %addr, "Client connected");
        (id, rx)
    }

    /// 注销连接 (幂等)
    pub fn unregister(&self, id: ConnectionId) -> bool {
        match self.inner.connections.remove(&id) {
            Some((_, entry)) => {
                tracing::info!(
                    connection_id = id,
                    role = %entry.info.role,
                    addr = %entry.info.addr,
                    "Client disconnected"
                );
                true
            }
            None => false,
        }
    }

    fn deliver(entry: &ConnectionEntry, text: &str) -> Delivery {
        match entry.tx.try_send(text.to_owned()) {
            Ok(()) => Delivery::Queued,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(
                    connection_id = entry.info.id,
                    role = %entry.info.role,
                    "Outbound queue full, dropping message"
                );
                Delivery::Dropped
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(connection_id = entry.info.id, "Outbound queue closed, dropping message");
                Delivery::Dropped
            }
        }
    }

    /// 发送原始文本帧给指定角色的所有连接，返回成功入队的数量
    pub fn send_to_role(&self, role: ClientRole, text: &str) -> usize {
        self.inner
            .connections
            .iter()
            .filter(|entry| entry.info.role == role)
            .filter(|entry| Self::deliver(entry, text) == Delivery::Queued)
            .count()
    }

    /// 客户端消息转发: 原样发送给互补角色
    pub fn forward(&self, from_role: ClientRole, text: &str) -> usize {
        let delivered = self.send_to_role(from_role.complement(), text);
        tracing::debug!(from = %from_role, delivered, "Forwarded message");
        delivered
    }

    /// 服务端发起的广播 (HTTP 下单 / 改状态)
    pub fn broadcast_to(&self, role: ClientRole, envelope: &Envelope) -> AppResult<usize> {
        let text = envelope.to_json()?;
        let delivered = self.send_to_role(role, &text);
        tracing::debug!(
            to = %role,
            message_type = %envelope.message_type,
            delivered,
            "Broadcast message"
        );
        Ok(delivered)
    }

    /// 发送给单个连接 (心跳应答)
    pub fn send_to(&self, id: ConnectionId, text: &str) -> bool {
        self.inner
            .connections
            .get(&id)
            .is_some_and(|entry| Self::deliver(&entry, text) == Delivery::Queued)
    }

    /// 发布到订单簿监听通道; 没有订阅者时静默忽略
    pub fn publish(&self, message: RelayedMessage) {
        let _ = self.inner.tap.send(message);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RelayedMessage> {
        self.inner.tap.subscribe()
    }

    /// 连接快照 (按 ID 排序)
    pub fn connections(&self) -> Vec<ConnectionInfo> {
        let mut list: Vec<ConnectionInfo> = self
            .inner
            .connections
            .iter()
            .map(|entry| entry.info.clone())
            .collect();
        list.sort_by_key(|c| c.id);
        list
    }

    pub fn count(&self, role: ClientRole) -> usize {
        self.inner
            .connections
            .iter()
            .filter(|entry| entry.info.role == role)
            .count()
    }

    pub fn counts(&self) -> ConnectionCounts {
        let mut counts = ConnectionCounts::default();
        for entry in self.inner.connections.iter() {
            match entry.info.role {
                ClientRole::Kitchen => counts.kitchen += 1,
                ClientRole::Waiter => counts.waiter += 1,
            }
        }
        counts
    }

    /// 清理写任务已经退出但未注销的连接，返回清理数量
    pub fn sweep_closed(&self) -> usize {
        let before = self.inner.connections.len();
        self.inner.connections.retain(|id, entry| {
            let alive = !entry.tx.is_closed();
            if !alive {
                tracing::warn!(connection_id = *id, role = %entry.info.role, "Removing stale connection");
            }
            alive
        });
        before.saturating_sub(self.inner.connections.len())
    }
}
