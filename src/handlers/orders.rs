use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    auth::{AdminUser, AuthUser},
    entities::notification,
    errors::ServiceError,
    handlers::AppState,
    services::orders::{CreateOrderRequest, OrderListResponse, OrderResponse, UpdateOrderRequest},
    ApiResponse, ApiResult,
};

#[derive(Debug, Deserialize)]
pub struct OrderListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    /// Admin-only filter; ignored for customers, who always see their own.
    pub user_id: Option<Uuid>,
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    20
}

pub async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreateOrderRequest>,
) -> ApiResult<OrderResponse> {
    let order = state
        .services
        .orders
        .create_order(user.user_id, request)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> ApiResult<OrderListResponse> {
    let user_filter = if user.is_admin() {
        query.user_id
    } else {
        Some(user.user_id)
    };

    let list = state
        .services
        .orders
        .list_orders(query.page, query.limit, user_filter)
        .await?;
    Ok(Json(ApiResponse::success(list)))
}

pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<OrderResponse> {
    let order = state.services.orders.get_order(id).await?;
    if order.user_id != user.user_id && !user.is_admin() {
        return Err(ServiceError::Forbidden(
            "You do not have access to this order".to_string(),
        ));
    }
    Ok(Json(ApiResponse::success(order)))
}

pub async fn update_order(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateOrderRequest>,
) -> ApiResult<OrderResponse> {
    let order = state.services.orders.update_order(id, request).await?;
    Ok(Json(ApiResponse::success(order)))
}

pub async fn delete_order(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    state.services.orders.delete_order(id).await?;
    Ok(Json(ApiResponse::success(json!({"deleted": true}))))
}

pub async fn list_notifications(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Vec<notification::Model>> {
    let rows = state
        .services
        .notifications
        .list_for_user(user.user_id)
        .await?;
    Ok(Json(ApiResponse::success(rows)))
}
