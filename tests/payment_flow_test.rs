mod common;

use assert_matches::assert_matches;
use rust_decimal_macros::dec;
use sea_orm::EntityTrait;
use sha2::{Digest, Sha256};
use std::str::FromStr;
use storefront_api::{
    entities::{order, product},
    errors::ServiceError,
    services::{
        orders::{CreateOrderRequest, OrderItemInput},
        payments::{EpaycoConfirmation, PaymentService},
    },
};
use uuid::Uuid;

use common::{test_config, TestApp};

fn sign(customer_id: &str, p_key: &str, reference: &str, txn_id: &str, amount: &str, currency: &str) -> String {
    let joined = format!("{customer_id}^{p_key}^{reference}^{txn_id}^{amount}^{currency}");
    hex::encode(Sha256::digest(joined.as_bytes()))
}

/// Builds a signed confirmation payload the way the gateway would, using
/// the test merchant credentials from `test_config`.
fn signed_confirmation(order_id: Uuid, code: &str, amount: &str) -> EpaycoConfirmation {
    let cfg = test_config().epayco;
    EpaycoConfirmation {
        x_ref_payco: Some("ref-0001".into()),
        x_id_invoice: Some(order_id.to_string()),
        x_amount: Some(amount.to_string()),
        x_currency_code: Some("COP".into()),
        x_signature: Some(sign(
            &cfg.customer_id,
            &cfg.p_key,
            "ref-0001",
            "txn-0001",
            amount,
            "COP",
        )),
        x_cod_response: Some(code.to_string()),
        x_response: Some("Aceptada".into()),
        x_response_reason_text: Some("Approved".into()),
        x_approval_code: Some("APR-77".into()),
        x_transaction_id: Some("txn-0001".into()),
        x_transaction_date: Some("2026-08-30 10:15:00".into()),
        x_franchise: Some("VS".into()),
        x_extra1: Some(order_id.to_string()),
        x_test_request: Some("TRUE".into()),
    }
}

async fn checkout_order(app: &TestApp, quantity: i32, stock: i32) -> (Uuid, product::Model) {
    let user = app.seed_customer().await;
    let addr = app.seed_address(user.id).await;
    let item = app.seed_product("Coffee Beans", dec!(100.00), stock).await;

    let fields = app
        .services
        .payments
        .create_checkout_session(
            user.id,
            CreateOrderRequest {
                address_id: addr.id,
                items: vec![OrderItemInput {
                    product_id: item.id,
                    quantity,
                }],
                notes: None,
            },
        )
        .await
        .unwrap();

    let order_id = Uuid::from_str(&fields["p_extra1"]).unwrap();
    (order_id, item)
}

async fn stock_of(app: &TestApp, product_id: Uuid) -> i32 {
    product::Entity::find_by_id(product_id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap()
        .stock
}

#[tokio::test]
async fn checkout_session_reserves_stock_and_builds_gateway_fields() {
    let app = TestApp::new().await;
    let user = app.seed_customer().await;
    let addr = app.seed_address(user.id).await;
    let item = app.seed_product("Coffee Beans", dec!(35.50), 10).await;

    let fields = app
        .services
        .payments
        .create_checkout_session(
            user.id,
            CreateOrderRequest {
                address_id: addr.id,
                items: vec![OrderItemInput {
                    product_id: item.id,
                    quantity: 2,
                }],
                notes: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(fields["p_cust_id_cliente"], "12345");
    assert_eq!(fields["p_key"], "test_p_key");
    assert_eq!(fields["p_amount"], "71.00");
    assert_eq!(fields["p_currency_code"], "COP");
    assert_eq!(fields["p_email"], user.email);
    assert_eq!(fields["p_billing_city"], addr.city);
    assert_eq!(fields["p_test_request"], "TRUE");
    assert_eq!(fields["p_id_invoice"], fields["p_extra1"]);
    assert!(fields["p_url_confirmation"].ends_with("/payments/epayco-confirmation"));

    let order_id = Uuid::from_str(&fields["p_id_invoice"]).unwrap();
    let stored = order::Entity::find_by_id(order_id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, "PENDING");
    assert_eq!(stored.payment_status, "PENDING");
    assert_eq!(stored.payment_method.as_deref(), Some("EPAYCO"));

    assert_eq!(stock_of(&app, item.id).await, 8);
}

#[tokio::test]
async fn checkout_rejects_inactive_products() {
    let app = TestApp::new().await;
    let user = app.seed_customer().await;
    let addr = app.seed_address(user.id).await;
    let retired = app
        .seed_product_with_active("Retired", dec!(10.00), 5, false)
        .await;

    let result = app
        .services
        .payments
        .create_checkout_session(
            user.id,
            CreateOrderRequest {
                address_id: addr.id,
                items: vec![OrderItemInput {
                    product_id: retired.id,
                    quantity: 1,
                }],
                notes: None,
            },
        )
        .await;

    assert_matches!(result, Err(ServiceError::ValidationError(_)));
    assert_eq!(stock_of(&app, retired.id).await, 5);
}

#[tokio::test]
async fn approved_confirmation_marks_the_order_paid() {
    let app = TestApp::new().await;
    let (order_id, item) = checkout_order(&app, 2, 10).await;

    let outcome = app
        .services
        .payments
        .handle_confirmation(signed_confirmation(order_id, "1", "200.00"))
        .await
        .unwrap();

    assert_eq!(outcome.order_status, "PAID");
    assert_eq!(outcome.payment_status, "COMPLETED");
    assert!(!outcome.already_processed);

    let stored = order::Entity::find_by_id(order_id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, "PAID");
    assert_eq!(stored.payment_status, "COMPLETED");
    assert_eq!(stored.payment_reference.as_deref(), Some("ref-0001"));
    assert_eq!(stored.transaction_id.as_deref(), Some("txn-0001"));
    assert_eq!(stored.approval_code.as_deref(), Some("APR-77"));
    assert_eq!(stored.response_code.as_deref(), Some("1"));
    assert_eq!(stored.response_message.as_deref(), Some("Approved"));
    assert!(stored.test_payment);

    // Paid orders keep their reservation.
    assert_eq!(stock_of(&app, item.id).await, 8);
}

#[tokio::test]
async fn declined_confirmation_cancels_and_releases_stock() {
    let app = TestApp::new().await;
    let (order_id, item) = checkout_order(&app, 2, 10).await;
    assert_eq!(stock_of(&app, item.id).await, 8);

    let outcome = app
        .services
        .payments
        .handle_confirmation(signed_confirmation(order_id, "2", "200.00"))
        .await
        .unwrap();

    assert_eq!(outcome.order_status, "CANCELLED");
    assert_eq!(outcome.payment_status, "REJECTED");
    assert_eq!(stock_of(&app, item.id).await, 10);
}

#[tokio::test]
async fn failed_confirmation_releases_stock_once() {
    let app = TestApp::new().await;
    let (order_id, item) = checkout_order(&app, 3, 10).await;
    assert_eq!(stock_of(&app, item.id).await, 7);

    let first = app
        .services
        .payments
        .handle_confirmation(signed_confirmation(order_id, "4", "300.00"))
        .await
        .unwrap();
    assert_eq!(first.order_status, "CANCELLED");
    assert_eq!(first.payment_status, "FAILED");
    assert_eq!(stock_of(&app, item.id).await, 10);

    // A replayed failure must not inflate stock.
    app.services
        .payments
        .handle_confirmation(signed_confirmation(order_id, "4", "300.00"))
        .await
        .unwrap();
    assert_eq!(stock_of(&app, item.id).await, 10);
}

#[tokio::test]
async fn settled_orders_ignore_replayed_confirmations() {
    let app = TestApp::new().await;
    let (order_id, item) = checkout_order(&app, 2, 10).await;

    app.services
        .payments
        .handle_confirmation(signed_confirmation(order_id, "1", "200.00"))
        .await
        .unwrap();

    // Even a contradictory replay is acknowledged without side effects.
    let replay = app
        .services
        .payments
        .handle_confirmation(signed_confirmation(order_id, "2", "200.00"))
        .await
        .unwrap();

    assert!(replay.already_processed);
    assert_eq!(replay.order_status, "PAID");
    assert_eq!(replay.payment_status, "COMPLETED");
    assert_eq!(stock_of(&app, item.id).await, 8);
}

#[tokio::test]
async fn pending_confirmation_leaves_the_reservation_in_place() {
    let app = TestApp::new().await;
    let (order_id, item) = checkout_order(&app, 2, 10).await;

    let outcome = app
        .services
        .payments
        .handle_confirmation(signed_confirmation(order_id, "3", "200.00"))
        .await
        .unwrap();

    assert_eq!(outcome.order_status, "PENDING");
    assert_eq!(outcome.payment_status, "PENDING");
    assert_eq!(stock_of(&app, item.id).await, 8);
}

#[tokio::test]
async fn unknown_response_code_parks_the_order() {
    let app = TestApp::new().await;
    let (order_id, item) = checkout_order(&app, 1, 10).await;

    let outcome = app
        .services
        .payments
        .handle_confirmation(signed_confirmation(order_id, "99", "100.00"))
        .await
        .unwrap();

    assert_eq!(outcome.order_status, "PENDING");
    assert_eq!(outcome.payment_status, "UNKNOWN");
    assert_eq!(stock_of(&app, item.id).await, 9);
}

#[tokio::test]
async fn tampered_signature_is_rejected_in_strict_mode() {
    let app = TestApp::new().await;
    let (order_id, item) = checkout_order(&app, 2, 10).await;

    let mut payload = signed_confirmation(order_id, "1", "200.00");
    payload.x_amount = Some("999.00".into());

    let result = app.services.payments.handle_confirmation(payload).await;
    assert_matches!(result, Err(ServiceError::Unauthorized(_)));

    // Nothing changed on the order.
    let stored = order::Entity::find_by_id(order_id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, "PENDING");
    assert_eq!(stored.payment_status, "PENDING");
    assert_eq!(stock_of(&app, item.id).await, 8);
}

#[tokio::test]
async fn lenient_mode_accepts_a_mismatched_signature() {
    let app = TestApp::new().await;
    let (order_id, _) = checkout_order(&app, 2, 10).await;

    let mut lenient_cfg = test_config().epayco;
    lenient_cfg.strict_signature = false;
    let lenient = PaymentService::new(app.db.clone(), app.services.orders.clone(), lenient_cfg);

    let mut payload = signed_confirmation(order_id, "1", "200.00");
    payload.x_signature = Some("bogus".into());

    let outcome = lenient.handle_confirmation(payload).await.unwrap();
    assert_eq!(outcome.order_status, "PAID");
    assert_eq!(outcome.payment_status, "COMPLETED");
}

#[tokio::test]
async fn confirmation_without_an_order_reference_is_rejected() {
    let app = TestApp::new().await;

    let payload = EpaycoConfirmation::default();
    let result = app.services.payments.handle_confirmation(payload).await;
    assert_matches!(result, Err(ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn confirmation_for_an_unknown_order_is_not_found() {
    let app = TestApp::new().await;

    let ghost = Uuid::new_v4();
    let result = app
        .services
        .payments
        .handle_confirmation(signed_confirmation(ghost, "1", "50.00"))
        .await;
    assert_matches!(result, Err(ServiceError::NotFound(_)));
}

#[tokio::test]
async fn payment_status_lookup_reflects_reconciliation() {
    let app = TestApp::new().await;
    let (order_id, _) = checkout_order(&app, 2, 10).await;

    app.services
        .payments
        .handle_confirmation(signed_confirmation(order_id, "1", "200.00"))
        .await
        .unwrap();

    let status = app
        .services
        .payments
        .order_payment_status(order_id)
        .await
        .unwrap();
    assert_eq!(status.status, "PAID");
    assert_eq!(status.payment_status, "COMPLETED");
    assert_eq!(status.payment_reference.as_deref(), Some("ref-0001"));

    assert_matches!(
        app.services.payments.order_payment_status(Uuid::new_v4()).await,
        Err(ServiceError::NotFound(_))
    );
}
