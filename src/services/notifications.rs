use crate::{db::DbPool, entities::notification, errors::ServiceError};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Persists user-facing notifications. Callers on state-change paths invoke
/// this fire-and-forget: a failed insert is logged, never propagated into
/// the surrounding transaction.
#[derive(Clone)]
pub struct NotificationService {
    db: Arc<DbPool>,
}

impl NotificationService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, message), fields(user_id = %user_id, kind = %kind))]
    pub async fn notify(
        &self,
        user_id: Uuid,
        title: &str,
        message: &str,
        kind: &str,
        link: Option<String>,
    ) -> Result<notification::Model, ServiceError> {
        let model = notification::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            title: Set(title.to_string()),
            message: Set(message.to_string()),
            kind: Set(kind.to_string()),
            link: Set(link),
            read: Set(false),
            created_at: Set(Utc::now()),
        };

        let created = model.insert(&*self.db).await?;
        info!(notification_id = %created.id, "Notification stored");
        Ok(created)
    }

    pub async fn list_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<notification::Model>, ServiceError> {
        let rows = notification::Entity::find()
            .filter(notification::Column::UserId.eq(user_id))
            .order_by_desc(notification::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(rows)
    }
}
