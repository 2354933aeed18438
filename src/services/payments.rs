use crate::{
    config::EpaycoConfig,
    db::DbPool,
    entities::{order, order_item},
    errors::ServiceError,
    services::orders::{
        release_stock, CreateOrderRequest, OrderService, OrderStatus, PAYMENT_COMPLETED,
    },
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use strum::Display;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// Confirmation webhook payload. ePayco POSTs many more `x_*` fields than
/// these; serde drops unknown keys, and only the fields below participate in
/// reconciliation.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct EpaycoConfirmation {
    pub x_ref_payco: Option<String>,
    pub x_id_invoice: Option<String>,
    pub x_amount: Option<String>,
    pub x_currency_code: Option<String>,
    pub x_signature: Option<String>,
    pub x_cod_response: Option<String>,
    pub x_response: Option<String>,
    pub x_response_reason_text: Option<String>,
    pub x_approval_code: Option<String>,
    pub x_transaction_id: Option<String>,
    pub x_transaction_date: Option<String>,
    pub x_franchise: Option<String>,
    pub x_extra1: Option<String>,
    pub x_test_request: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConfirmationResponse {
    pub order_id: Uuid,
    pub order_status: String,
    pub payment_status: String,
    pub already_processed: bool,
}

#[derive(Debug, Serialize)]
pub struct OrderPaymentStatus {
    pub order_id: Uuid,
    #[serde(skip)]
    pub user_id: Uuid,
    pub status: String,
    pub payment_status: String,
    pub payment_reference: Option<String>,
    pub transaction_id: Option<String>,
}

/// Gateway payment states as persisted on `orders.payment_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "UPPERCASE")]
enum PaymentState {
    Pending,
    Completed,
    Rejected,
    Failed,
    Reversed,
    Held,
    Initiated,
    Expired,
    Abandoned,
    Antifraud,
    Cancelled,
    Unknown,
}

/// Maps the ePayco numeric response code to the (order, payment) status
/// pair. Unrecognized codes park the order in PENDING/UNKNOWN rather than
/// guessing an outcome.
fn map_response_code(code: &str) -> (OrderStatus, PaymentState) {
    match code.trim() {
        "1" => (OrderStatus::Paid, PaymentState::Completed),
        "2" => (OrderStatus::Cancelled, PaymentState::Rejected),
        "3" => (OrderStatus::Pending, PaymentState::Pending),
        "4" => (OrderStatus::Cancelled, PaymentState::Failed),
        "6" => (OrderStatus::Cancelled, PaymentState::Reversed),
        "7" => (OrderStatus::Pending, PaymentState::Held),
        "8" => (OrderStatus::Pending, PaymentState::Initiated),
        "9" => (OrderStatus::Cancelled, PaymentState::Expired),
        "10" => (OrderStatus::Cancelled, PaymentState::Abandoned),
        "11" => (OrderStatus::Cancelled, PaymentState::Cancelled),
        "12" => (OrderStatus::Pending, PaymentState::Antifraud),
        _ => (OrderStatus::Pending, PaymentState::Unknown),
    }
}

/// Expected confirmation signature:
/// SHA256 over the `^`-joined merchant credentials and transaction fields.
fn expected_signature(
    customer_id: &str,
    p_key: &str,
    ref_payco: &str,
    transaction_id: &str,
    amount: &str,
    currency: &str,
) -> String {
    let joined = format!("{customer_id}^{p_key}^{ref_payco}^{transaction_id}^{amount}^{currency}");
    hex::encode(Sha256::digest(joined.as_bytes()))
}

fn flag_is_true(value: Option<&str>) -> bool {
    matches!(
        value.map(str::trim),
        Some(v) if v.eq_ignore_ascii_case("true") || v == "1"
    )
}

/// Hosted-checkout handoff and webhook reconciliation for ePayco.
#[derive(Clone)]
pub struct PaymentService {
    db: Arc<DbPool>,
    orders: Arc<OrderService>,
    config: EpaycoConfig,
}

impl PaymentService {
    pub fn new(db: Arc<DbPool>, orders: Arc<OrderService>, config: EpaycoConfig) -> Self {
        Self { db, orders, config }
    }

    /// Creates a PENDING order (reserving stock exactly like a direct
    /// order, with the extra requirement that every product is active) and
    /// returns the field map for the hosted payment page redirect.
    #[instrument(skip(self, request), fields(user_id = %user_id))]
    pub async fn create_checkout_session(
        &self,
        user_id: Uuid,
        request: CreateOrderRequest,
    ) -> Result<BTreeMap<String, String>, ServiceError> {
        request.validate()?;

        let (user, addr) = self
            .orders
            .resolve_user_and_address(user_id, request.address_id)
            .await?;

        let order = self
            .orders
            .place_order(
                &user,
                &addr,
                &request.items,
                request.notes,
                Some("EPAYCO".to_string()),
                true,
            )
            .await?;

        let mut fields = BTreeMap::new();
        fields.insert("p_cust_id_cliente".into(), self.config.customer_id.clone());
        fields.insert("p_key".into(), self.config.p_key.clone());
        // Invoice id doubles as the order id; x_extra1 echoes it back on the
        // confirmation webhook for correlation.
        fields.insert("p_id_invoice".into(), order.id.to_string());
        fields.insert(
            "p_description".into(),
            format!("Order {} ({} items)", order.id, order.items.len()),
        );
        fields.insert("p_amount".into(), order.total.to_string());
        fields.insert("p_amount_base".into(), "0".into());
        fields.insert("p_currency_code".into(), self.config.currency.clone());
        fields.insert("p_email".into(), user.email.clone());
        fields.insert("p_billing_name".into(), addr.recipient.clone());
        fields.insert("p_billing_phone".into(), addr.phone.clone());
        fields.insert("p_billing_address".into(), addr.line1.clone());
        fields.insert("p_billing_city".into(), addr.city.clone());
        fields.insert("p_billing_country".into(), addr.country.clone());
        fields.insert("p_url_response".into(), self.config.response_url.clone());
        fields.insert(
            "p_url_confirmation".into(),
            self.config.confirmation_url.clone(),
        );
        fields.insert(
            "p_test_request".into(),
            if self.config.test_mode { "TRUE" } else { "FALSE" }.into(),
        );
        fields.insert("p_extra1".into(), order.id.to_string());

        info!(order_id = %order.id, "Checkout session created");
        Ok(fields)
    }

    /// Reconciles an asynchronous gateway confirmation. Idempotent: replays
    /// after the order has reached PAID/COMPLETED are acknowledged without
    /// touching order or stock state.
    #[instrument(skip(self, payload))]
    pub async fn handle_confirmation(
        &self,
        payload: EpaycoConfirmation,
    ) -> Result<ConfirmationResponse, ServiceError> {
        let order_ref = payload
            .x_extra1
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or(payload.x_id_invoice.as_deref())
            .ok_or_else(|| {
                ServiceError::ValidationError(
                    "Confirmation payload carries no order reference".to_string(),
                )
            })?;
        let order_id = Uuid::from_str(order_ref.trim()).map_err(|_| {
            ServiceError::ValidationError(format!("Invalid order reference: {order_ref}"))
        })?;

        self.verify_signature(&payload, order_id)?;

        let txn = self.db.begin().await?;

        let order = order::Entity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        // Safe-replay guard: a fully settled order is never reprocessed.
        if order.payment_status == PAYMENT_COMPLETED
            && order.status == OrderStatus::Paid.to_string()
        {
            info!(order_id = %order_id, "Confirmation replay ignored; order already settled");
            return Ok(ConfirmationResponse {
                order_id,
                order_status: order.status,
                payment_status: order.payment_status,
                already_processed: true,
            });
        }

        let code = payload.x_cod_response.as_deref().unwrap_or("");
        let (new_status, payment_state) = map_response_code(code);
        let previous_status = OrderStatus::from_str(&order.status).ok();

        let releases_stock = (new_status == OrderStatus::Cancelled
            || payment_state == PaymentState::Failed)
            && previous_status != Some(OrderStatus::Cancelled);

        let user_facing_message = payload
            .x_response_reason_text
            .clone()
            .or_else(|| payload.x_response.clone());

        let mut active: order::ActiveModel = order.into();
        active.status = Set(new_status.to_string());
        active.payment_status = Set(payment_state.to_string());
        active.payment_reference = Set(payload.x_ref_payco.clone());
        active.approval_code = Set(payload.x_approval_code.clone());
        active.response_code = Set(payload.x_cod_response.clone());
        active.response_message = Set(user_facing_message);
        active.transaction_id = Set(payload.x_transaction_id.clone());
        active.payment_date = Set(payload.x_transaction_date.clone());
        active.test_payment = Set(flag_is_true(payload.x_test_request.as_deref()));
        active.updated_at = Set(Some(Utc::now()));
        active.update(&txn).await?;

        if releases_stock {
            let items = order_item::Entity::find()
                .filter(order_item::Column::OrderId.eq(order_id))
                .all(&txn)
                .await?;
            for item in &items {
                release_stock(&txn, item.product_id, item.quantity).await?;
            }
        }

        txn.commit().await?;

        info!(
            order_id = %order_id,
            response_code = %code,
            order_status = %new_status,
            payment_status = %payment_state,
            released_stock = releases_stock,
            "Payment confirmation processed"
        );

        Ok(ConfirmationResponse {
            order_id,
            order_status: new_status.to_string(),
            payment_status: payment_state.to_string(),
            already_processed: false,
        })
    }

    /// Payment status lookup for the post-payment response page.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn order_payment_status(
        &self,
        order_id: Uuid,
    ) -> Result<OrderPaymentStatus, ServiceError> {
        let order = order::Entity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        Ok(OrderPaymentStatus {
            order_id: order.id,
            user_id: order.user_id,
            status: order.status,
            payment_status: order.payment_status,
            payment_reference: order.payment_reference,
            transaction_id: order.transaction_id,
        })
    }

    fn verify_signature(
        &self,
        payload: &EpaycoConfirmation,
        order_id: Uuid,
    ) -> Result<(), ServiceError> {
        let expected = expected_signature(
            &self.config.customer_id,
            &self.config.p_key,
            payload.x_ref_payco.as_deref().unwrap_or(""),
            payload.x_transaction_id.as_deref().unwrap_or(""),
            payload.x_amount.as_deref().unwrap_or(""),
            payload.x_currency_code.as_deref().unwrap_or(""),
        );

        let supplied = payload.x_signature.as_deref().unwrap_or("");
        if expected.eq_ignore_ascii_case(supplied.trim()) {
            return Ok(());
        }

        warn!(order_id = %order_id, "Confirmation signature mismatch");
        if self.config.strict_signature {
            return Err(ServiceError::Unauthorized(
                "Invalid confirmation signature".to_string(),
            ));
        }
        // Lenient mode is for sandbox gateways, which sign inconsistently.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_code_mapping_matches_gateway_table() {
        assert_eq!(
            map_response_code("1"),
            (OrderStatus::Paid, PaymentState::Completed)
        );
        assert_eq!(
            map_response_code("2"),
            (OrderStatus::Cancelled, PaymentState::Rejected)
        );
        assert_eq!(
            map_response_code("3"),
            (OrderStatus::Pending, PaymentState::Pending)
        );
        assert_eq!(
            map_response_code("4"),
            (OrderStatus::Cancelled, PaymentState::Failed)
        );
        assert_eq!(
            map_response_code("6"),
            (OrderStatus::Cancelled, PaymentState::Reversed)
        );
        assert_eq!(
            map_response_code("7"),
            (OrderStatus::Pending, PaymentState::Held)
        );
        assert_eq!(
            map_response_code("8"),
            (OrderStatus::Pending, PaymentState::Initiated)
        );
        assert_eq!(
            map_response_code("9"),
            (OrderStatus::Cancelled, PaymentState::Expired)
        );
        assert_eq!(
            map_response_code("10"),
            (OrderStatus::Cancelled, PaymentState::Abandoned)
        );
        assert_eq!(
            map_response_code("11"),
            (OrderStatus::Cancelled, PaymentState::Cancelled)
        );
        assert_eq!(
            map_response_code("12"),
            (OrderStatus::Pending, PaymentState::Antifraud)
        );
    }

    #[test]
    fn unknown_response_codes_park_the_order() {
        for code in ["", "0", "5", "99", "abc"] {
            assert_eq!(
                map_response_code(code),
                (OrderStatus::Pending, PaymentState::Unknown)
            );
        }
    }

    #[test]
    fn signature_is_sha256_of_caret_joined_fields() {
        let sig = expected_signature("12345", "test_p_key", "ref123", "txn789", "200.00", "COP");
        assert_eq!(
            sig,
            "b630e040b2a631206a1f6dcb33102d2d7d49ea427d71e1ce07c0fd1d9e264ec7"
        );
    }

    #[test]
    fn signature_changes_with_any_field() {
        let base = expected_signature("12345", "test_p_key", "ref123", "txn789", "200.00", "COP");
        let tampered =
            expected_signature("12345", "test_p_key", "ref123", "txn789", "999.00", "COP");
        assert_ne!(base, tampered);
    }

    #[test]
    fn test_request_flag_parsing() {
        assert!(flag_is_true(Some("TRUE")));
        assert!(flag_is_true(Some("true")));
        assert!(flag_is_true(Some("1")));
        assert!(!flag_is_true(Some("FALSE")));
        assert!(!flag_is_true(Some("0")));
        assert!(!flag_is_true(None));
    }

    #[test]
    fn payment_states_serialize_uppercase() {
        assert_eq!(PaymentState::Completed.to_string(), "COMPLETED");
        assert_eq!(PaymentState::Antifraud.to_string(), "ANTIFRAUD");
        assert_eq!(PaymentState::Unknown.to_string(), "UNKNOWN");
    }
}
