//! Order API Handlers

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use shared::{
    ClientRole, CreateOrderRequest, Envelope, Order, OrderItem, UpdateStatusRequest,
    util::now_millis,
};

use crate::core::ServerState;
use crate::utils::{ApiResponse, AppError, AppResult};

/// 推送给指定角色; 推送失败不影响 HTTP 结果
fn push(state: &ServerState, roles: &[ClientRole], envelope: AppResult<Envelope>) {
    let envelope = match envelope {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build envelope");
            return;
        }
    };
    for role in roles {
        if let Err(e) = state.relay.broadcast_to(*role, &envelope) {
            tracing::error!(role = %role, error = %e, "Failed to broadcast");
        }
    }
}

/// POST /api/orders - POS 下单
///
/// 缺少名称/单价的明细从商品目录补全，校验后存入订单簿并推送给厨房。
pub async fn create(
    State(state): State<ServerState>,
    Json(req): Json<CreateOrderRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Order>>)> {
    let items = req
        .items
        .iter()
        .map(|item| state.catalog.resolve_item(item))
        .collect::<AppResult<Vec<OrderItem>>>()?;

    let mut order = Order::new(req.order_type, items);
    order.table_number = req.table_number;
    order.takeout_number = req.takeout_number;
    order.notes = req.notes;

    let order = state.orders.create(order)?;
    tracing::info!(
        order_id = %order.id,
        order_type = %order.order_type,
        items = order.items.len(),
        total = order.total(),
        "Order created"
    );

    push(&state, &[ClientRole::Kitchen], Envelope::kitchen_order(&order));

    Ok((StatusCode::CREATED, Json(ApiResponse::success(order))))
}

/// GET /api/orders - 未完成订单
pub async fn list_active(State(state): State<ServerState>) -> Json<ApiResponse<Vec<Order>>> {
    Json(ApiResponse::success(state.orders.active()))
}

/// GET /api/orders/history - 已完成订单
pub async fn list_history(State(state): State<ServerState>) -> Json<ApiResponse<Vec<Order>>> {
    Json(ApiResponse::success(state.orders.history()))
}

/// GET /api/orders/{id}
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order = state
        .orders
        .get(&id)
        .ok_or_else(|| AppError::order_not_found(&id))?;
    Ok(Json(ApiResponse::success(order)))
}

/// POST /api/orders/{id}/status - 改状态
///
/// 不允许的迁移返回 409；状态未变化时不推送。
pub async fn update_status(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let (order, changed) = state.orders.transition(&id, req.status, now_millis())?;

    if changed {
        tracing::info!(order_id = %order.id, status = %order.status, "Order status changed");
        push(
            &state,
            &[ClientRole::Kitchen, ClientRole::Waiter],
            Envelope::order_update(&order),
        );
    }

    Ok(Json(ApiResponse::success(order)))
}
