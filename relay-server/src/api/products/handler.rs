//! Product API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use shared::Product;

use crate::core::ServerState;
use crate::utils::{ApiResponse, AppError, AppResult};

/// GET /api/products - 启用的商品
pub async fn list(State(state): State<ServerState>) -> Json<ApiResponse<Vec<Product>>> {
    Json(ApiResponse::success(state.catalog.active()))
}

/// GET /api/products/{id}
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let product = state
        .catalog
        .get(id)
        .cloned()
        .ok_or_else(|| AppError::product_not_found(id))?;
    Ok(Json(ApiResponse::success(product)))
}
