//! Server Implementation
//!
//! HTTP / WebSocket 服务器启动和管理

use std::future::Future;
use std::net::SocketAddr;

use tokio::net::TcpListener;

use crate::api::build_app;
use crate::core::{Config, Result, ServerState};

/// HTTP Server
pub struct Server {
    config: Config,
    state: Option<ServerState>,
}

impl Server {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            state: None,
        }
    }

    /// Create server with existing state
    pub fn with_state(config: Config, state: ServerState) -> Self {
        Self {
            config,
            state: Some(state),
        }
    }

    /// 绑定配置的地址并运行，直到收到 Ctrl-C
    pub async fn run(&self) -> Result<()> {
        let addr = self.config.socket_addr();
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Relay server listening on {}", addr);

        let shutdown = async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down...");
        };
        self.serve(listener, shutdown).await
    }

    /// 在已绑定的 listener 上运行，`shutdown` 完成后优雅退出
    ///
    /// 测试中绑定 `127.0.0.1:0` 后调用。
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let state = match &self.state {
            Some(s) => s.clone(),
            None => ServerState::initialize(&self.config)?,
        };

        let tasks = state.start_background_tasks();
        let app = build_app(&state);

        // 关闭信号同时取消所有 WebSocket 连接任务
        let token = state.shutdown.clone();
        let signal = async move {
            shutdown.await;
            token.cancel();
        };

        let result = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(signal)
        .await;

        state.shutdown.cancel();
        tasks.shutdown(self.config.shutdown_timeout()).await;

        result?;
        tracing::info!("Relay server stopped");
        Ok(())
    }
}
