use axum::{extract::State, response::Json};
use serde_json::{json, Value};

use crate::{
    auth::{LoginRequest, RefreshRequest, TokenPair},
    handlers::AppState,
    ApiResponse, ApiResult,
};

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<TokenPair> {
    let pair = state.services.auth.login(request).await?;
    Ok(Json(ApiResponse::success(pair)))
}

pub async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> ApiResult<TokenPair> {
    let pair = state.services.auth.refresh(&request.refresh_token).await?;
    Ok(Json(ApiResponse::success(pair)))
}

pub async fn logout(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> ApiResult<Value> {
    state.services.auth.logout(&request.refresh_token).await?;
    Ok(Json(ApiResponse::success(json!({"logged_out": true}))))
}
