//! Order API 模块
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/orders | POST | POS 下单, 推送 kitchen_order 给厨房 |
//! | /api/orders | GET | 未完成订单 |
//! | /api/orders/history | GET | 已完成订单 |
//! | /api/orders/{id} | GET | 单个订单 |
//! | /api/orders/{id}/status | POST | 改状态, 推送 order_update 给所有连接 |

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/orders", order_routes())
}

fn order_routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list_active).post(handler::create))
        .route("/history", get(handler::list_history))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/status", post(handler::update_status))
}
