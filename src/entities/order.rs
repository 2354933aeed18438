use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    /// One of PENDING, PAID, SHIPPED, DELIVERED, CANCELLED
    /// (`services::orders::OrderStatus`).
    pub status: String,
    /// Provider-shaped payment state; PENDING until the gateway reports.
    pub payment_status: String,
    pub total: Decimal,

    // Shipping snapshot copied from the selected address at creation time.
    pub ship_recipient: String,
    pub ship_phone: String,
    pub ship_line1: String,
    pub ship_line2: Option<String>,
    pub ship_city: String,
    pub ship_state: String,
    pub ship_postal_code: String,
    pub ship_country: String,
    pub notes: Option<String>,

    // Payment metadata filled in by the confirmation webhook.
    pub payment_method: Option<String>,
    pub payment_reference: Option<String>,
    pub approval_code: Option<String>,
    pub response_code: Option<String>,
    pub response_message: Option<String>,
    pub transaction_id: Option<String>,
    pub payment_date: Option<String>,
    pub test_payment: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
