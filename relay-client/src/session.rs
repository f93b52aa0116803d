//! Relay WebSocket session with automatic reconnect
//!
//! 1. Connect `ws://host:port/ws?type=role`
//! 2. Publish incoming envelopes on a broadcast channel
//! 3. Drain the outbound queue into the socket, send `heartbeat` periodically
//! 4. On any failure wait a fixed `reconnect_delay` and reconnect, until cancelled

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::{SinkExt, StreamExt};
use shared::{Envelope, MessageType};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use crate::{ClientConfig, ClientError, ClientResult};

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Incoming envelope channel capacity
const INCOMING_CAPACITY: usize = 256;
/// Connection event channel capacity
const EVENT_CAPACITY: usize = 16;

/// Connection state change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Connected,
    Disconnected { reason: String },
}

/// 单次 WebSocket 连接 (不重连)
pub struct RelaySession {
    ws: WsStream,
}

impl RelaySession {
    /// Open `ws://host:port/ws?type=role`
    pub async fn connect(config: &ClientConfig) -> ClientResult<Self> {
        let url = config.ws_url();
        let (ws, _response) = tokio_tungstenite::connect_async(url.as_str()).await?;
        tracing::info!(url = %url, "Connected to relay");
        Ok(Self { ws })
    }

    pub fn into_inner(self) -> WsStream {
        self.ws
    }
}

/// Handle to a running [`RelayConnection`]
///
/// Cheap to clone. Dropping every handle does not stop the session; call
/// [`RelayHandle::shutdown`].
#[derive(Debug, Clone)]
pub struct RelayHandle {
    outbound: mpsc::Sender<Envelope>,
    incoming: broadcast::Sender<Envelope>,
    events: broadcast::Sender<ConnectionEvent>,
    connected: Arc<AtomicBool>,
    shutdown: CancellationToken,
}

impl RelayHandle {
    /// Queue an envelope for the relay
    ///
    /// Fails when the queue is full; queued messages are flushed after a
    /// reconnect.
    pub fn send(&self, envelope: Envelope) -> ClientResult<()> {
        self.outbound.try_send(envelope).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                ClientError::NotConnected("outbound queue is full".to_string())
            }
            mpsc::error::TrySendError::Closed(_) => {
                ClientError::NotConnected("session stopped".to_string())
            }
        })
    }

    /// Subscribe to envelopes received from the relay (heartbeats excluded)
    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.incoming.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.events.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Stop the supervisor loop and close the socket
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

/// Why a session ended
enum SessionEnd {
    Shutdown,
    Lost(String),
}

/// Supervisor: connect, run, wait, reconnect
pub struct RelayConnection {
    config: ClientConfig,
    outbound: mpsc::Receiver<Envelope>,
    incoming: broadcast::Sender<Envelope>,
    events: broadcast::Sender<ConnectionEvent>,
    connected: Arc<AtomicBool>,
    shutdown: CancellationToken,
}

impl RelayConnection {
    /// Build the connection and its handle without starting it
    pub fn new(config: ClientConfig) -> (Self, RelayHandle) {
        let (outbound_tx, outbound_rx) = mpsc::channel(config.outbound_capacity.max(1));
        let (incoming, _) = broadcast::channel(INCOMING_CAPACITY);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let connected = Arc::new(AtomicBool::new(false));
        let shutdown = CancellationToken::new();

        let handle = RelayHandle {
            outbound: outbound_tx,
            incoming: incoming.clone(),
            events: events.clone(),
            connected: connected.clone(),
            shutdown: shutdown.clone(),
        };
        let connection = Self {
            config,
            outbound: outbound_rx,
            incoming,
            events,
            connected,
            shutdown,
        };
        (connection, handle)
    }

    /// Start the supervisor loop on the runtime
    pub fn spawn(config: ClientConfig) -> (RelayHandle, JoinHandle<()>) {
        let (connection, handle) = Self::new(config);
        (handle, tokio::spawn(connection.run()))
    }

    /// Main run loop: connect, run the session, reconnect after a fixed delay
    pub async fn run(mut self) {
        tracing::info!(role = %self.config.role, url = %self.config.ws_url(), "Relay connection started");

        loop {
            if self.shutdown.is_cancelled() {
                break;
            }

            let attempt = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                attempt = tokio::time::timeout(
                    self.config.timeout,
                    RelaySession::connect(&self.config),
                ) => attempt,
            };

            let reason = match attempt {
                Err(_) => format!(
                    "handshake timed out after {}ms",
                    self.config.timeout.as_millis()
                ),
                Ok(Err(e)) => e.to_string(),
                Ok(Ok(session)) => {
                    self.set_connected(true);
                    let _ = self.events.send(ConnectionEvent::Connected);
                    match self.run_session(session.into_inner()).await {
                        SessionEnd::Shutdown => {
                            self.set_connected(false);
                            break;
                        }
                        SessionEnd::Lost(reason) => reason,
                    }
                }
            };

            self.set_connected(false);
            tracing::warn!(
                delay_ms = self.config.reconnect_delay.as_millis() as u64,
                "Relay connection lost, retrying: {reason}"
            );
            let _ = self.events.send(ConnectionEvent::Disconnected { reason });

            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.config.reconnect_delay) => {},
            }
        }

        let _ = self.events.send(ConnectionEvent::Disconnected {
            reason: "shutdown".to_string(),
        });
        tracing::info!("Relay connection stopped");
    }

    fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Run a single session until disconnect or shutdown
    async fn run_session(&mut self, ws: WsStream) -> SessionEnd {
        let (mut ws_sink, mut ws_stream) = ws.split();

        let period = self.config.heartbeat_interval;
        let mut heartbeat =
            tokio::time::interval_at(tokio::time::Instant::now() + period, period);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    let _ = ws_sink.close().await;
                    return SessionEnd::Shutdown;
                }

                _ = heartbeat.tick() => {
                    let text = match Envelope::heartbeat().to_json() {
                        Ok(text) => text,
                        Err(e) => return SessionEnd::Lost(e.to_string()),
                    };
                    if let Err(e) = ws_sink.send(Message::Text(text.into())).await {
                        return SessionEnd::Lost(format!("heartbeat failed: {e}"));
                    }
                }

                next = self.outbound.recv() => {
                    let Some(envelope) = next else {
                        return SessionEnd::Shutdown;
                    };
                    match envelope.to_json() {
                        Ok(text) => {
                            if let Err(e) = ws_sink.send(Message::Text(text.into())).await {
                                return SessionEnd::Lost(format!("send failed: {e}"));
                            }
                        }
                        Err(e) => tracing::error!("Dropping unserializable envelope: {e}"),
                    }
                }

                msg = ws_stream.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => self.handle_text(text.as_str()),
                        Some(Ok(Message::Close(_))) => {
                            return SessionEnd::Lost("closed by relay".to_string());
                        }
                        Some(Err(e)) => return SessionEnd::Lost(e.to_string()),
                        None => return SessionEnd::Lost("stream ended".to_string()),
                        // Ping 的 Pong 由 tungstenite 在下一次读写时自动回复
                        _ => {}
                    }
                }
            }
        }
    }

    fn handle_text(&self, text: &str) {
        match Envelope::from_json(text) {
            Ok(envelope) if envelope.message_type == MessageType::Heartbeat => {
                tracing::trace!("Heartbeat acknowledged");
            }
            Ok(envelope) => {
                let _ = self.incoming.send(envelope);
            }
            Err(e) => tracing::warn!("Ignoring malformed frame from relay: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::ClientRole;
    use std::time::Duration;

    #[tokio::test]
    async fn test_send_while_stopped_queues_then_fails_when_full() {
        let config = ClientConfig::new("127.0.0.1", ClientRole::Kitchen).with_outbound_capacity(1);
        let (_connection, handle) = RelayConnection::new(config);

        assert!(!handle.is_connected());
        handle.send(Envelope::heartbeat()).unwrap();
        let err = handle.send(Envelope::heartbeat()).unwrap_err();
        assert!(matches!(err, ClientError::NotConnected(_)));
    }

    #[tokio::test]
    async fn test_reconnect_loop_reports_failures_and_stops() {
        // nothing listens on port 1
        let config = ClientConfig::kitchen("127.0.0.1")
            .with_port(1)
            .with_reconnect_delay(Duration::from_millis(20));
        let (handle, task) = RelayConnection::spawn(config);
        let mut events = handle.events();

        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(event, ConnectionEvent::Disconnected { .. }));

        handle.shutdown();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
        assert!(!handle.is_connected());
    }

    /// 接受 TCP 但从不完成握手的主机
    async fn silent_listener() -> (u16, JoinHandle<()>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let task = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        (port, task)
    }

    #[tokio::test]
    async fn test_shutdown_while_handshake_hangs() {
        let (port, listener) = silent_listener().await;
        let config = ClientConfig::kitchen("127.0.0.1")
            .with_port(port)
            .with_timeout(Duration::from_secs(60));
        let (handle, task) = RelayConnection::spawn(config);

        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.shutdown();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
        listener.abort();
    }

    #[tokio::test]
    async fn test_handshake_timeout_counts_as_lost() {
        let (port, listener) = silent_listener().await;
        let config = ClientConfig::kitchen("127.0.0.1")
            .with_port(port)
            .with_timeout(Duration::from_millis(200))
            .with_reconnect_delay(Duration::from_millis(20));
        let (handle, task) = RelayConnection::spawn(config);
        let mut events = handle.events();

        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .unwrap()
            .unwrap();
        match event {
            ConnectionEvent::Disconnected { reason } => assert!(reason.contains("timed out")),
            other => panic!("expected a timeout, got {:?}", other),
        }

        handle.shutdown();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
        listener.abort();
    }
}
