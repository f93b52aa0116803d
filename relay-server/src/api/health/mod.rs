//! 健康检查路由
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /health | GET | 健康检查, 客户端子网发现时探测 |
//! | /health/connections | GET | 当前 WebSocket 连接列表 |
//!
//! ```json
//! {
//!   "status": "ok",
//!   "version": "0.1.0",
//!   "uptime_seconds": 42,
//!   "connections": { "kitchen": 1, "waiter": 2 }
//! }
//! ```

use axum::{Json, Router, extract::State, routing::get};
use shared::HealthResponse;

use crate::core::ServerState;
use crate::relay::ConnectionInfo;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/connections", get(connections))
}

/// GET /health
pub async fn health(State(state): State<ServerState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime().as_secs(),
        connections: state.relay.counts(),
    })
}

/// GET /health/connections
pub async fn connections(State(state): State<ServerState>) -> Json<Vec<ConnectionInfo>> {
    Json(state.relay.connections())
}
