//! Notification settings repository.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};

use crate::entities::notification_settings::{ActiveModel, Entity, Model};
use farmvisit_common::{AppError, AppResult};

/// Repository for per-user notification preferences.
#[derive(Clone)]
pub struct NotificationSettingsRepository {
    db: Arc<DatabaseConnection>,
}

impl NotificationSettingsRepository {
    /// Create a new notification settings repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find the settings row for a user.
    pub async fn find_by_user_id(&self, user_id: &str) -> AppResult<Option<Model>> {
        Entity::find_by_id(user_id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get the settings for a user, creating defaults if none exist.
    pub async fn get_or_create(&self, user_id: &str) -> AppResult<Model> {
        if let Some(settings) = self.find_by_user_id(user_id).await? {
            return Ok(settings);
        }

        let now = Utc::now();
        let model = ActiveModel {
            user_id: Set(user_id.to_string()),
            delivery_method: Set("push".to_string()),
            notify_visit_scheduled: Set(true),
            notify_visit_reminder: Set(true),
            notify_visit_cancelled: Set(true),
            notify_system: Set(false),
            is_active: Set(true),
            created_at: Set(now.into()),
            updated_at: Set(None),
        };

        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a settings row.
    pub async fn update(&self, model: ActiveModel) -> AppResult<Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
