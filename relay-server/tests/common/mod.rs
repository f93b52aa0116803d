//! 集成测试共用: 在 127.0.0.1:0 上启动中继

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use relay_server::{Config, ProductCatalog, Server, ServerState};
use shared::{Envelope, HealthResponse, Product};
use tempfile::TempDir;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

pub type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct TestRelay {
    pub addr: SocketAddr,
    pub state: ServerState,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
    _work_dir: TempDir,
}

impl TestRelay {
    pub async fn start() -> Self {
        Self::start_with_products(Vec::new()).await
    }

    pub async fn start_with_products(products: Vec<Product>) -> Self {
        Self::start_with_config(products, |_| {}).await
    }

    /// 启动前修改配置 (超时等)
    pub async fn start_with_config(
        products: Vec<Product>,
        configure: impl FnOnce(&mut Config),
    ) -> Self {
        let work_dir = TempDir::new().unwrap();
        let mut config = Config::with_overrides(work_dir.path().to_string_lossy(), 0);
        configure(&mut config);
        let state = ServerState::with_catalog(&config, ProductCatalog::new(products));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();

        let server = Server::with_state(config, state.clone());
        let handle = tokio::spawn(async move {
            server
                .serve(listener, async move {
                    let _ = rx.await;
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            state,
            shutdown: Some(tx),
            handle: Some(handle),
            _work_dir: work_dir,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// 以指定角色连接 `/ws`, 并等待服务器完成注册
    pub async fn connect(&self, role: &str) -> Ws {
        let before = self.health().await.connections.total();
        let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws?type={}", self.addr, role))
            .await
            .unwrap();
        self.wait_for_total(before + 1).await;
        ws
    }

    pub async fn health(&self) -> HealthResponse {
        reqwest::get(self.url("/health"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }

    pub async fn wait_for_total(&self, expected: usize) {
        self.wait_for_total_within(expected, Duration::from_secs(2)).await;
    }

    pub async fn wait_for_total_within(&self, expected: usize, wait: Duration) {
        let deadline = tokio::time::Instant::now() + wait;
        while tokio::time::Instant::now() < deadline {
            if self.health().await.connections.total() == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("relay never reached {expected} connections");
    }

    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            tokio::time::timeout(Duration::from_secs(15), handle)
                .await
                .unwrap()
                .unwrap();
        }
    }
}

pub async fn send(ws: &mut Ws, envelope: &Envelope) {
    ws.send(Message::Text(envelope.to_json().unwrap().into()))
        .await
        .unwrap();
}

/// 等待下一个文本帧, 超时返回 None
pub async fn recv(ws: &mut Ws, wait: Duration) -> Option<Envelope> {
    let deadline = tokio::time::Instant::now() + wait;
    loop {
        let next = tokio::time::timeout_at(deadline, ws.next()).await.ok()??;
        match next.ok()? {
            Message::Text(text) => return Some(Envelope::from_json(text.as_str()).unwrap()),
            Message::Close(_) => return None,
            _ => continue,
        }
    }
}

pub async fn recv_one(ws: &mut Ws) -> Envelope {
    recv(ws, Duration::from_secs(3))
        .await
        .expect("expected a message from the relay")
}

pub async fn assert_silent(ws: &mut Ws) {
    if let Some(envelope) = recv(ws, Duration::from_millis(300)).await {
        panic!("unexpected message: {:?}", envelope);
    }
}
