//! WebSocket 中继入口
//!
//! `GET /ws?type=kitchen|waiter` 升级为 WebSocket；
//! 缺少或未知的 `type` 返回 400。

use std::net::SocketAddr;

use axum::{
    Router,
    extract::{ConnectInfo, Query, State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;
use shared::{ClientRole, ErrorCode};

use crate::core::ServerState;
use crate::relay::run_connection;
use crate::utils::{AppError, AppResult};

pub fn router() -> Router<ServerState> {
    Router::new().route("/ws", get(handle_ws))
}

#[derive(Debug, Deserialize)]
pub struct WsParams {
    #[serde(rename = "type")]
    pub role: Option<String>,
}

impl WsParams {
    fn role(&self) -> AppResult<ClientRole> {
        match self.role.as_deref() {
            Some(value) => value.parse(),
            None => Err(AppError::with_message(
                ErrorCode::InvalidClientRole,
                "Missing client type, expected ?type=kitchen or ?type=waiter",
            )),
        }
    }
}

/// GET /ws?type=... 升级为 WebSocket
pub async fn handle_ws(
    State(state): State<ServerState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Query(params): Query<WsParams>,
    ws: WebSocketUpgrade,
) -> AppResult<impl IntoResponse> {
    let role = params.role()?;
    let settings = state.connection_settings();
    let relay = state.relay.clone();
    let shutdown = state.shutdown.clone();

    Ok(ws.on_upgrade(move |socket| run_connection(socket, relay, role, addr, settings, shutdown)))
}
