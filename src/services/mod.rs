pub mod notifications;
pub mod orders;
pub mod payments;

use crate::{auth::AuthService, config::AppConfig, db::DbPool};
use notifications::NotificationService;
use orders::OrderService;
use payments::PaymentService;
use std::sync::Arc;

/// All service instances, built once at startup and cloned into handlers.
#[derive(Clone)]
pub struct AppServices {
    pub auth: Arc<AuthService>,
    pub notifications: Arc<NotificationService>,
    pub orders: Arc<OrderService>,
    pub payments: Arc<PaymentService>,
}

impl AppServices {
    pub fn new(db: Arc<DbPool>, config: &AppConfig) -> Self {
        let auth = Arc::new(AuthService::new(db.clone(), config));
        let notifications = Arc::new(NotificationService::new(db.clone()));
        let orders = Arc::new(OrderService::new(db.clone(), notifications.clone()));
        let payments = Arc::new(PaymentService::new(
            db,
            orders.clone(),
            config.epayco.clone(),
        ));

        Self {
            auth,
            notifications,
            orders,
            payments,
        }
    }
}
