//! 单个 WebSocket 连接的生命周期
//!
//! - 读循环在连接任务内运行：解析信封、应答心跳、转发给互补角色
//! - 写任务独占 socket 的发送端：消费发送队列并定时发送 ping
//! - 超过 `idle_timeout` 未收到任何帧 (包括 pong) 即断开

use std::net::SocketAddr;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use shared::{ClientRole, Envelope, MessageType};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::hub::{ConnectionId, Relay, RelayedMessage};

/// 连接参数
#[derive(Debug, Clone, Copy)]
pub struct ConnectionSettings {
    pub ping_interval: Duration,
    pub idle_timeout: Duration,
}

/// 读循环对一条文本帧的处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    /// 已转发给 n 个互补角色连接
    Forwarded(usize),
    /// 心跳, 已应答发送者
    HeartbeatAnswered,
    /// 无法解析, 已忽略
    Malformed,
}

/// 处理一条客户端文本帧
///
/// 转发的是原始文本，不重新序列化。
pub fn handle_text(relay: &Relay, id: ConnectionId, role: ClientRole, text: &str) -> FrameOutcome {
    let envelope = match Envelope::from_json(text) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::warn!(connection_id = id, role = %role, error = %e, "Ignoring malformed frame");
            return FrameOutcome::Malformed;
        }
    };

    match envelope.message_type.route_from(role) {
        None => {
            debug_assert_eq!(envelope.message_type, MessageType::Heartbeat);
            if let Ok(reply) = Envelope::heartbeat().to_json() {
                relay.send_to(id, &reply);
            }
            FrameOutcome::HeartbeatAnswered
        }
        Some(_) => {
            let message_type = envelope.message_type;
            // 先进订单簿再转发，保证对端的回执排在后面
            relay.publish(RelayedMessage {
                connection_id: id,
                from: role,
                envelope,
            });
            let delivered = relay.forward(role, text);
            tracing::debug!(
                connection_id = id,
                message_type = %message_type,
                delivered,
                "Relayed message"
            );
            FrameOutcome::Forwarded(delivered)
        }
    }
}

/// 运行一个已升级的连接直到断开或服务器关闭
pub async fn run_connection(
    socket: WebSocket,
    relay: Relay,
    role: ClientRole,
    addr: SocketAddr,
    settings: ConnectionSettings,
    shutdown: CancellationToken,
) {
    let (id, outbound) = relay.register(role, addr);
    let (ws_sink, mut ws_stream) = socket.split();

    let conn_token = shutdown.child_token();
    let writer = tokio::spawn(write_loop(
        ws_sink,
        outbound,
        settings.ping_interval,
        conn_token.clone(),
    ));

    loop {
        tokio::select! {
            _ = conn_token.cancelled() => break,

            frame = tokio::time::timeout(settings.idle_timeout, ws_stream.next()) => {
                match frame {
                    Err(_) => {
                        tracing::info!(connection_id = id, role = %role, "Connection idle, closing");
                        break;
                    }
                    Ok(Some(Ok(Message::Text(text)))) => {
                        handle_text(&relay, id, role, text.as_str());
                    }
                    Ok(Some(Ok(Message::Close(_)))) | Ok(None) => break,
                    Ok(Some(Err(e))) => {
                        tracing::warn!(connection_id = id, role = %role, "WebSocket error: {e}");
                        break;
                    }
                    // Binary, Ping, Pong: 只用于刷新空闲计时
                    Ok(Some(Ok(_))) => {}
                }
            }
        }
    }

    conn_token.cancel();
    if let Err(e) = writer.await {
        tracing::error!(connection_id = id, error = ?e, "Writer task failed");
    }
    relay.unregister(id);
}

/// 写任务: 发送队列 + keepalive ping
async fn write_loop(
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<String>,
    ping_interval: Duration,
    token: CancellationToken,
) {
    let mut ping = tokio::time::interval_at(tokio::time::Instant::now() + ping_interval, ping_interval);

    loop {
        tokio::select! {
            _ = token.cancelled() => {
                let _ = ws_sink.send(Message::Close(None)).await;
                break;
            }

            next = outbound.recv() => {
                let Some(text) = next else { break };
                if let Err(e) = ws_sink.send(Message::Text(text.into())).await {
                    tracing::debug!("WebSocket send failed: {e}");
                    break;
                }
            }

            _ = ping.tick() => {
                if ws_sink.send(Message::Ping(Bytes::new())).await.is_err() {
                    tracing::debug!("WebSocket ping failed");
                    break;
                }
            }
        }
    }

    // 写端退出时通知读循环
    token.cancel();
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{Order, OrderItem, OrderType};

    fn addr() -> SocketAddr {
        "127.0.0.1:6000".parse().unwrap()
    }

    #[test]
    fn test_heartbeat_answered_to_sender_only() {
        let relay = Relay::new(8);
        let (waiter_id, mut waiter) = relay.register(ClientRole::Waiter, addr());
        let (_k, mut kitchen) = relay.register(ClientRole::Kitchen, addr());

        let outcome = handle_text(&relay, waiter_id, ClientRole::Waiter, r#"{"type":"heartbeat","data":{}}"#);
        assert_eq!(outcome, FrameOutcome::HeartbeatAnswered);

        let reply = Envelope::from_json(&waiter.try_recv().unwrap()).unwrap();
        assert_eq!(reply.message_type, MessageType::Heartbeat);
        assert!(kitchen.try_recv().is_err());
    }

    #[test]
    fn test_order_forwarded_verbatim_and_tapped() {
        let relay = Relay::new(8);
        let mut tap = relay.subscribe();
        let (waiter_id, mut waiter) = relay.register(ClientRole::Waiter, addr());
        let (_k, mut kitchen) = relay.register(ClientRole::Kitchen, addr());

        let order = Order::new(OrderType::Takeout, vec![OrderItem::new(1, "Arepa", 2, 3.5)])
            .with_takeout_number(12);
        let text = Envelope::order_new(&order).unwrap().to_json().unwrap();

        let outcome = handle_text(&relay, waiter_id, ClientRole::Waiter, &text);
        assert_eq!(outcome, FrameOutcome::Forwarded(1));
        assert_eq!(kitchen.try_recv().unwrap(), text);
        // no echo to the sender's own role
        assert!(waiter.try_recv().is_err());

        let tapped = tap.try_recv().unwrap();
        assert_eq!(tapped.from, ClientRole::Waiter);
        assert_eq!(tapped.envelope.order().unwrap(), order);
    }

    #[test]
    fn test_malformed_frame_ignored() {
        let relay = Relay::new(8);
        let (id, _rx) = relay.register(ClientRole::Kitchen, addr());
        let (_w, mut waiter) = relay.register(ClientRole::Waiter, addr());

        assert_eq!(handle_text(&relay, id, ClientRole::Kitchen, "{oops"), FrameOutcome::Malformed);
        assert!(waiter.try_recv().is_err());
    }
}
