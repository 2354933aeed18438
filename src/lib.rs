//! Storefront API Library
//!
//! Order management, ePayco checkout and webhook reconciliation for a
//! small e-commerce storefront.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod migrator;
pub mod services;

use axum::{
    extract::FromRef,
    response::Json,
    routing::{delete, get, patch, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<db::DbPool>,
    pub config: config::AppConfig,
    pub services: services::AppServices,
}

// The auth extractors pull the AuthService straight out of whatever state
// the router carries.
impl FromRef<AppState> for Arc<auth::AuthService> {
    fn from_ref(state: &AppState) -> Self {
        state.services.auth.clone()
    }
}

// Common response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            errors: None,
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Login, refresh and logout, mounted at the root (`/auth`).
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(handlers::auth::login))
        .route("/refresh", post(handlers::auth::refresh))
        .route("/logout", post(handlers::auth::logout))
}

pub fn api_v1_routes() -> Router<AppState> {
    let order_routes = Router::new()
        .route(
            "/orders",
            get(handlers::orders::list_orders).post(handlers::orders::create_order),
        )
        .route("/orders/:id", get(handlers::orders::get_order))
        .route("/orders/:id", patch(handlers::orders::update_order))
        .route("/orders/:id", delete(handlers::orders::delete_order));

    // The confirmation endpoint is unauthenticated; ePayco calls it
    // server-to-server and authenticates via the payload signature.
    let payment_routes = Router::new()
        .route(
            "/payments/create-session",
            post(handlers::payments::create_checkout_session),
        )
        .route(
            "/payments/epayco-confirmation",
            post(handlers::payments::epayco_confirmation),
        )
        .route(
            "/payments/order-status/:id",
            get(handlers::payments::order_payment_status),
        );

    let notification_routes = Router::new().route(
        "/notifications",
        get(handlers::orders::list_notifications),
    );

    Router::new()
        .merge(order_routes)
        .merge(payment_routes)
        .merge(notification_routes)
}

#[cfg(test)]
mod response_tests {
    use super::*;

    #[test]
    fn success_response_wraps_data() {
        let response = ApiResponse::success("ok");
        assert!(response.success);
        assert_eq!(response.data, Some("ok"));
        assert!(response.message.is_none());
    }

    #[test]
    fn error_response_carries_message() {
        let response = ApiResponse::<()>::error("oops".into());
        assert!(!response.success);
        assert!(response.data.is_none());
        assert_eq!(response.message.as_deref(), Some("oops"));
    }
}
