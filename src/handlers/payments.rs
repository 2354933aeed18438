use axum::{
    extract::{Form, Path, State},
    response::Json,
};
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    errors::ServiceError,
    handlers::AppState,
    services::{
        orders::CreateOrderRequest,
        payments::{ConfirmationResponse, EpaycoConfirmation, OrderPaymentStatus},
    },
    ApiResponse, ApiResult,
};

/// Hosted checkout page the client POSTs the session fields to.
const EPAYCO_CHECKOUT_URL: &str = "https://secure.payco.co/checkout.php";

#[derive(Debug, Serialize)]
pub struct CheckoutSession {
    pub gateway_url: &'static str,
    pub fields: BTreeMap<String, String>,
}

pub async fn create_checkout_session(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreateOrderRequest>,
) -> ApiResult<CheckoutSession> {
    let fields = state
        .services
        .payments
        .create_checkout_session(user.user_id, request)
        .await?;

    Ok(Json(ApiResponse::success(CheckoutSession {
        gateway_url: EPAYCO_CHECKOUT_URL,
        fields,
    })))
}

/// Server-to-server confirmation from ePayco. Unauthenticated; the payload
/// signature is what gets verified. The gateway sends a form-encoded body.
pub async fn epayco_confirmation(
    State(state): State<AppState>,
    Form(payload): Form<EpaycoConfirmation>,
) -> ApiResult<ConfirmationResponse> {
    let outcome = state.services.payments.handle_confirmation(payload).await?;
    Ok(Json(ApiResponse::success(outcome)))
}

pub async fn order_payment_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<OrderPaymentStatus> {
    let status = state.services.payments.order_payment_status(id).await?;
    if status.user_id != user.user_id && !user.is_admin() {
        return Err(ServiceError::Forbidden(
            "You do not have access to this order".to_string(),
        ));
    }
    Ok(Json(ApiResponse::success(status)))
}
