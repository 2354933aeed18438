use crate::{
    db::DbPool,
    entities::{address, order, order_item, product, user},
    errors::ServiceError,
    services::notifications::NotificationService,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use strum::{Display, EnumString};
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// Order lifecycle states. Stored uppercase in the `orders.status` column.
/// There is no enforced transition graph; only crossing the CANCELLED
/// boundary has stock side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum OrderStatus {
    Pending,
    Paid,
    Shipped,
    Delivered,
    Cancelled,
}

/// Initial payment state for newly placed orders.
pub const PAYMENT_PENDING: &str = "PENDING";
/// Terminal payment state used by the webhook replay guard.
pub const PAYMENT_COMPLETED: &str = "COMPLETED";

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderRequest {
    pub address_id: Uuid,
    #[validate(length(min = 1, message = "Order must contain at least one item"))]
    pub items: Vec<OrderItemInput>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemInput {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateOrderRequest {
    pub status: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ShippingSnapshot {
    pub recipient: String,
    pub phone: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

#[derive(Debug, Serialize)]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub payment_status: String,
    pub total: Decimal,
    pub shipping: ShippingSnapshot,
    pub notes: Option<String>,
    pub payment_method: Option<String>,
    pub payment_reference: Option<String>,
    pub transaction_id: Option<String>,
    pub test_payment: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub items: Vec<OrderItemResponse>,
}

#[derive(Debug, Serialize)]
pub struct OrderListResponse {
    pub orders: Vec<OrderResponse>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

/// Decrements product stock with a single conditional UPDATE. The filter on
/// `stock >= qty` plus the affected-row check is what keeps stock from going
/// negative under concurrent requests; there is no read-then-write anywhere
/// on this path.
pub(crate) async fn reserve_stock<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    product_name: &str,
    quantity: i32,
) -> Result<(), ServiceError> {
    let result = product::Entity::update_many()
        .col_expr(
            product::Column::Stock,
            Expr::col(product::Column::Stock).sub(quantity),
        )
        .filter(product::Column::Id.eq(product_id))
        .filter(product::Column::Stock.gte(quantity))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Err(ServiceError::InsufficientStock(format!(
            "Product '{}' does not have {} units available",
            product_name, quantity
        )));
    }
    Ok(())
}

/// Returns previously reserved stock. Increments are unconditional; they
/// cannot violate the non-negative invariant.
pub(crate) async fn release_stock<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    quantity: i32,
) -> Result<(), ServiceError> {
    product::Entity::update_many()
        .col_expr(
            product::Column::Stock,
            Expr::col(product::Column::Stock).add(quantity),
        )
        .filter(product::Column::Id.eq(product_id))
        .exec(conn)
        .await?;
    Ok(())
}

fn line_subtotal(unit_price: Decimal, quantity: i32) -> Decimal {
    unit_price * Decimal::from(quantity)
}

fn parse_status(raw: &str) -> Result<OrderStatus, ServiceError> {
    OrderStatus::from_str(raw)
        .map_err(|_| ServiceError::InvalidStatus(format!("Unknown order status: {raw}")))
}

/// Service for placing, querying and administering orders.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DbPool>,
    notifications: Arc<NotificationService>,
}

impl OrderService {
    pub fn new(db: Arc<DbPool>, notifications: Arc<NotificationService>) -> Self {
        Self { db, notifications }
    }

    /// Places an order for `user_id`, reserving stock atomically with the
    /// order insert. Any failure leaves the database untouched.
    #[instrument(skip(self, request), fields(user_id = %user_id))]
    pub async fn create_order(
        &self,
        user_id: Uuid,
        request: CreateOrderRequest,
    ) -> Result<OrderResponse, ServiceError> {
        request.validate()?;

        let (user, addr) = self.resolve_user_and_address(user_id, request.address_id).await?;
        self.place_order(&user, &addr, &request.items, request.notes, None, false)
            .await
    }

    /// Shared placement path for direct orders and payment sessions.
    /// `require_active` additionally rejects inactive products (payment
    /// sessions only); `payment_method` tags gateway-bound orders.
    pub(crate) async fn place_order(
        &self,
        user: &user::Model,
        addr: &address::Model,
        items: &[OrderItemInput],
        notes: Option<String>,
        payment_method: Option<String>,
        require_active: bool,
    ) -> Result<OrderResponse, ServiceError> {
        if items.is_empty() {
            return Err(ServiceError::ValidationError(
                "Order must contain at least one item".to_string(),
            ));
        }
        for item in items {
            if item.quantity < 1 {
                return Err(ServiceError::ValidationError(format!(
                    "Quantity for product {} must be at least 1",
                    item.product_id
                )));
            }
        }

        // One query for every referenced product.
        let product_ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
        let products: HashMap<Uuid, product::Model> = product::Entity::find()
            .filter(product::Column::Id.is_in(product_ids))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let mut total = Decimal::ZERO;
        for item in items {
            let prod = products.get(&item.product_id).ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not found", item.product_id))
            })?;
            if require_active && !prod.is_active {
                return Err(ServiceError::ValidationError(format!(
                    "Product '{}' is not available for purchase",
                    prod.name
                )));
            }
            if prod.stock < item.quantity {
                return Err(ServiceError::InsufficientStock(format!(
                    "Product '{}' does not have {} units available",
                    prod.name, item.quantity
                )));
            }
            // Current product price is the authoritative snapshot.
            total += line_subtotal(prod.price, item.quantity);
        }

        let now = Utc::now();
        let order_id = Uuid::new_v4();

        let txn = self.db.begin().await?;

        let order_model = order::ActiveModel {
            id: Set(order_id),
            user_id: Set(user.id),
            status: Set(OrderStatus::Pending.to_string()),
            payment_status: Set(PAYMENT_PENDING.to_string()),
            total: Set(total),
            ship_recipient: Set(addr.recipient.clone()),
            ship_phone: Set(addr.phone.clone()),
            ship_line1: Set(addr.line1.clone()),
            ship_line2: Set(addr.line2.clone()),
            ship_city: Set(addr.city.clone()),
            ship_state: Set(addr.state.clone()),
            ship_postal_code: Set(addr.postal_code.clone()),
            ship_country: Set(addr.country.clone()),
            notes: Set(notes),
            payment_method: Set(payment_method),
            payment_reference: Set(None),
            approval_code: Set(None),
            response_code: Set(None),
            response_message: Set(None),
            transaction_id: Set(None),
            payment_date: Set(None),
            test_payment: Set(false),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        }
        .insert(&txn)
        .await?;

        let mut created_items = Vec::with_capacity(items.len());
        for item in items {
            let prod = &products[&item.product_id];
            let row = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(prod.id),
                product_name: Set(prod.name.clone()),
                quantity: Set(item.quantity),
                unit_price: Set(prod.price),
                created_at: Set(now),
            }
            .insert(&txn)
            .await?;
            created_items.push(row);
        }

        // Reserve after the inserts so a failed decrement rolls everything
        // back in one shot.
        for item in items {
            let prod = &products[&item.product_id];
            reserve_stock(&txn, prod.id, &prod.name, item.quantity).await?;
        }

        txn.commit().await?;

        info!(order_id = %order_id, user_id = %user.id, total = %total, "Order created");
        Ok(model_to_response(order_model, created_items))
    }

    /// Retrieves an order with its items.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_order(&self, order_id: Uuid) -> Result<OrderResponse, ServiceError> {
        let order = order::Entity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let items = order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(&*self.db)
            .await?;

        Ok(model_to_response(order, items))
    }

    /// Lists orders, newest first. `user_filter` scopes the listing to one
    /// customer; admins pass `None` to see everything.
    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        page: u64,
        limit: u64,
        user_filter: Option<Uuid>,
    ) -> Result<OrderListResponse, ServiceError> {
        let mut query = order::Entity::find().order_by_desc(order::Column::CreatedAt);
        if let Some(user_id) = user_filter {
            query = query.filter(order::Column::UserId.eq(user_id));
        }

        let paginator = query.paginate(&*self.db, limit.max(1));
        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page.saturating_sub(1)).await?;

        let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
        let mut items_by_order: HashMap<Uuid, Vec<order_item::Model>> = HashMap::new();
        if !order_ids.is_empty() {
            for item in order_item::Entity::find()
                .filter(order_item::Column::OrderId.is_in(order_ids))
                .all(&*self.db)
                .await?
            {
                items_by_order.entry(item.order_id).or_default().push(item);
            }
        }

        let orders = orders
            .into_iter()
            .map(|o| {
                let items = items_by_order.remove(&o.id).unwrap_or_default();
                model_to_response(o, items)
            })
            .collect();

        Ok(OrderListResponse {
            orders,
            total,
            page,
            limit,
        })
    }

    /// Admin status/notes update. Transitions across the CANCELLED boundary
    /// reconcile stock inside the same transaction as the order update;
    /// reaching DELIVERED fires a best-effort notification after commit.
    #[instrument(skip(self, request), fields(order_id = %order_id))]
    pub async fn update_order(
        &self,
        order_id: Uuid,
        request: UpdateOrderRequest,
    ) -> Result<OrderResponse, ServiceError> {
        request.validate()?;

        let new_status = request.status.as_deref().map(parse_status).transpose()?;

        let txn = self.db.begin().await?;

        let order = order::Entity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;
        let old_status = parse_status(&order.status)?;
        let user_id = order.user_id;

        if let Some(new_status) = new_status {
            if new_status == OrderStatus::Cancelled && old_status != OrderStatus::Cancelled {
                // Stock release: the order's reservation goes back on shelf.
                let items = order_item::Entity::find()
                    .filter(order_item::Column::OrderId.eq(order_id))
                    .all(&txn)
                    .await?;
                for item in &items {
                    release_stock(&txn, item.product_id, item.quantity).await?;
                }
            } else if old_status == OrderStatus::Cancelled && new_status != OrderStatus::Cancelled {
                // Reactivation must re-reserve every line or fail atomically.
                let items = order_item::Entity::find()
                    .filter(order_item::Column::OrderId.eq(order_id))
                    .all(&txn)
                    .await?;
                for item in &items {
                    reserve_stock(&txn, item.product_id, &item.product_name, item.quantity)
                        .await?;
                }
            }
        }

        let mut active: order::ActiveModel = order.into();
        if let Some(new_status) = new_status {
            active.status = Set(new_status.to_string());
        }
        if let Some(notes) = request.notes {
            active.notes = Set(Some(notes));
        }
        active.updated_at = Set(Some(Utc::now()));
        active.update(&txn).await?;

        txn.commit().await?;

        info!(
            order_id = %order_id,
            old_status = %old_status,
            new_status = ?new_status,
            "Order updated"
        );

        if new_status == Some(OrderStatus::Delivered) && old_status != OrderStatus::Delivered {
            // Best-effort side effect; must never undo the committed update.
            if let Err(err) = self
                .notifications
                .notify(
                    user_id,
                    "Order delivered",
                    &format!("Your order {} has been delivered", order_id),
                    "order",
                    Some(format!("/orders/{}", order_id)),
                )
                .await
            {
                warn!(order_id = %order_id, error = %err, "Failed to store delivery notification");
            }
        }

        self.get_order(order_id).await
    }

    /// Admin removal. Orders that still hold a reservation (any status but
    /// CANCELLED) have their stock returned before the rows go away.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn delete_order(&self, order_id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;

        let order = order::Entity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        if parse_status(&order.status)? != OrderStatus::Cancelled {
            let items = order_item::Entity::find()
                .filter(order_item::Column::OrderId.eq(order_id))
                .all(&txn)
                .await?;
            for item in &items {
                release_stock(&txn, item.product_id, item.quantity).await?;
            }
        }

        order_item::Entity::delete_many()
            .filter(order_item::Column::OrderId.eq(order_id))
            .exec(&txn)
            .await?;
        order::Entity::delete_by_id(order_id).exec(&txn).await?;

        txn.commit().await?;
        info!(order_id = %order_id, "Order removed");
        Ok(())
    }

    pub(crate) async fn resolve_user_and_address(
        &self,
        user_id: Uuid,
        address_id: Uuid,
    ) -> Result<(user::Model, address::Model), ServiceError> {
        let user = user::Entity::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", user_id)))?;

        let addr = address::Entity::find_by_id(address_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Address {} not found", address_id)))?;

        if addr.user_id != user.id {
            return Err(ServiceError::Forbidden(format!(
                "Address {} does not belong to the requesting user",
                address_id
            )));
        }

        Ok((user, addr))
    }
}

pub(crate) fn model_to_response(
    order: order::Model,
    items: Vec<order_item::Model>,
) -> OrderResponse {
    let items = items
        .into_iter()
        .map(|item| OrderItemResponse {
            id: item.id,
            product_id: item.product_id,
            product_name: item.product_name,
            quantity: item.quantity,
            subtotal: line_subtotal(item.unit_price, item.quantity),
            unit_price: item.unit_price,
        })
        .collect();

    OrderResponse {
        id: order.id,
        user_id: order.user_id,
        status: order.status,
        payment_status: order.payment_status,
        total: order.total,
        shipping: ShippingSnapshot {
            recipient: order.ship_recipient,
            phone: order.ship_phone,
            line1: order.ship_line1,
            line2: order.ship_line2,
            city: order.ship_city,
            state: order.ship_state,
            postal_code: order.ship_postal_code,
            country: order.ship_country,
        },
        notes: order.notes,
        payment_method: order.payment_method,
        payment_reference: order.payment_reference,
        transaction_id: order.transaction_id,
        test_payment: order.test_payment,
        created_at: order.created_at,
        updated_at: order.updated_at,
        items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Paid,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(parse_status(&status.to_string()).unwrap(), status);
        }
        assert_eq!(OrderStatus::Pending.to_string(), "PENDING");
        assert_eq!(parse_status("cancelled").unwrap(), OrderStatus::Cancelled);
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!(matches!(
            parse_status("REFUNDED"),
            Err(ServiceError::InvalidStatus(_))
        ));
    }

    #[test]
    fn line_subtotal_multiplies_price_by_quantity() {
        assert_eq!(line_subtotal(dec!(100.00), 2), dec!(200.00));
        assert_eq!(line_subtotal(dec!(19.99), 3), dec!(59.97));
        assert_eq!(line_subtotal(dec!(5), 0), dec!(0));
    }
}
