use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, Set};
use storefront_api::{
    auth::{hash_password, ROLE_ADMIN, ROLE_CUSTOMER},
    config::{AppConfig, EpaycoConfig},
    db::{self, DbPool},
    entities::{address, product, user},
    services::AppServices,
};
use uuid::Uuid;

/// Application services backed by a fresh in-memory SQLite database.
///
/// SQLite keeps one in-memory database per connection, so the pool is
/// pinned to a single connection.
pub struct TestApp {
    pub db: Arc<DbPool>,
    pub services: AppServices,
    pub config: AppConfig,
}

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test_secret_key_for_testing_purposes_only_32chars".to_string(),
        jwt_expiration: 3600,
        refresh_token_expiration: 86_400,
        host: "127.0.0.1".to_string(),
        port: 18_080,
        environment: "test".to_string(),
        log_level: "debug".to_string(),
        log_json: false,
        auto_migrate: true,
        cors_allowed_origins: None,
        db_max_connections: 1,
        db_min_connections: 1,
        db_connect_timeout_secs: 5,
        db_idle_timeout_secs: 600,
        db_acquire_timeout_secs: 5,
        epayco: EpaycoConfig {
            customer_id: "12345".to_string(),
            p_key: "test_p_key".to_string(),
            currency: "COP".to_string(),
            test_mode: true,
            response_url: "https://shop.test/checkout/result".to_string(),
            confirmation_url: "https://shop.test/api/v1/payments/epayco-confirmation".to_string(),
            strict_signature: true,
        },
    }
}

impl TestApp {
    pub async fn new() -> Self {
        let config = test_config();

        let mut options = ConnectOptions::new(config.database_url.clone());
        options.max_connections(1).min_connections(1);
        let pool = Database::connect(options)
            .await
            .expect("failed to open in-memory database");

        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db = Arc::new(pool);
        let services = AppServices::new(db.clone(), &config);

        Self {
            db,
            services,
            config,
        }
    }

    pub async fn seed_user(&self, email: &str, role: &str) -> user::Model {
        user::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email.to_string()),
            password_hash: Set(hash_password("correct horse battery").unwrap()),
            name: Set("Test Shopper".to_string()),
            phone: Set(Some("+57-300-555-0101".to_string())),
            role: Set(role.to_string()),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(&*self.db)
        .await
        .expect("failed to seed user")
    }

    pub async fn seed_customer(&self) -> user::Model {
        self.seed_user("shopper@example.com", ROLE_CUSTOMER).await
    }

    #[allow(dead_code)]
    pub async fn seed_customer_rival(&self) -> user::Model {
        self.seed_user("rival@example.com", ROLE_CUSTOMER).await
    }

    #[allow(dead_code)]
    pub async fn seed_admin(&self) -> user::Model {
        self.seed_user("admin@example.com", ROLE_ADMIN).await
    }

    pub async fn seed_address(&self, user_id: Uuid) -> address::Model {
        address::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            recipient: Set("Test Shopper".to_string()),
            phone: Set("+57-300-555-0101".to_string()),
            line1: Set("Calle 93 #12-34".to_string()),
            line2: Set(Some("Apto 501".to_string())),
            city: Set("Bogota".to_string()),
            state: Set("Cundinamarca".to_string()),
            postal_code: Set("110221".to_string()),
            country: Set("CO".to_string()),
            is_default: Set(true),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await
        .expect("failed to seed address")
    }

    pub async fn seed_product(&self, name: &str, price: Decimal, stock: i32) -> product::Model {
        self.seed_product_with_active(name, price, stock, true).await
    }

    pub async fn seed_product_with_active(
        &self,
        name: &str,
        price: Decimal,
        stock: i32,
        is_active: bool,
    ) -> product::Model {
        product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            description: Set(Some(format!("{name} description"))),
            price: Set(price),
            stock: Set(stock),
            is_active: Set(is_active),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(&*self.db)
        .await
        .expect("failed to seed product")
    }
}
