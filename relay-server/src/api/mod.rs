//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查 (子网发现使用)
//! - [`products`] - 商品目录
//! - [`orders`] - 下单、订单查询和改状态
//! - [`ws`] - WebSocket 中继入口

pub mod health;
pub mod middleware;
pub mod orders;
pub mod products;
pub mod ws;

use axum::Router;
use axum::middleware as axum_middleware;
use http::{HeaderName, HeaderValue};
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::core::ServerState;

/// Custom request ID generator
#[derive(Clone)]
struct XRequestId;

impl MakeRequestId for XRequestId {
    fn make_request_id<B>(&mut self, _request: &http::Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// 注册所有路由 (无中间件, 无状态)
pub fn build_router() -> Router<ServerState> {
    Router::new()
        .merge(health::router())
        .merge(products::router())
        .merge(orders::router())
        .merge(ws::router())
}

/// 完整的应用: 路由 + 中间件 + 状态
pub fn build_app(state: &ServerState) -> Router {
    build_router()
        .with_state(state.clone())
        // ========== Tower HTTP Middleware ==========
        // CORS - POS 前端和手机端跨域访问
        .layer(CorsLayer::permissive())
        // Request logging
        .layer(axum_middleware::from_fn(middleware::logging_middleware))
        // Trace - Request tracing
        .layer(TraceLayer::new_for_http())
        // Request ID - Generate unique ID for each request
        .layer(SetRequestIdLayer::new(
            HeaderName::from_static("x-request-id"),
            XRequestId,
        ))
        // Propagate request ID to response
        .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
            "x-request-id",
        )))
}
