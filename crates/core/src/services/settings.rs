//! Per-user notification preferences.
//!
//! Storage only; which users actually receive a given notification is decided
//! by the delivery component that reads these records.

use chrono::Utc;
use sea_orm::Set;
use serde::{Deserialize, Serialize};

use farmvisit_common::{AppError, AppResult};
use farmvisit_db::entities::notification_settings;
use farmvisit_db::repositories::NotificationSettingsRepository;

const DELIVERY_METHODS: [&str; 3] = ["push", "email", "none"];

/// Input for updating notification settings; absent fields are untouched.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNotificationSettingsInput {
    /// Delivery method: "push", "email" or "none".
    pub delivery_method: Option<String>,
    /// Notify when a visit is scheduled.
    pub notify_visit_scheduled: Option<bool>,
    /// Notify shortly before a scheduled visit.
    pub notify_visit_reminder: Option<bool>,
    /// Notify when a visit is cancelled or rescheduled.
    pub notify_visit_cancelled: Option<bool>,
    /// Notify on system announcements.
    pub notify_system: Option<bool>,
    /// Whether notifications are enabled at all.
    pub is_active: Option<bool>,
}

/// Notification settings as exposed over the API.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettingsResponse {
    /// Delivery method.
    pub delivery_method: String,
    /// Notify when a visit is scheduled.
    pub notify_visit_scheduled: bool,
    /// Notify shortly before a scheduled visit.
    pub notify_visit_reminder: bool,
    /// Notify when a visit is cancelled or rescheduled.
    pub notify_visit_cancelled: bool,
    /// Notify on system announcements.
    pub notify_system: bool,
    /// Whether notifications are enabled at all.
    pub is_active: bool,
}

/// Notification settings service.
#[derive(Clone)]
pub struct NotificationSettingsService {
    repo: NotificationSettingsRepository,
}

impl NotificationSettingsService {
    /// Create a new notification settings service.
    #[must_use]
    pub const fn new(repo: NotificationSettingsRepository) -> Self {
        Self { repo }
    }

    /// Get the user's settings, creating defaults on first read.
    pub async fn get(&self, user_id: &str) -> AppResult<NotificationSettingsResponse> {
        let model = self.repo.get_or_create(user_id).await?;
        Ok(to_response(model))
    }

    /// Apply a partial update to the user's settings.
    pub async fn update(
        &self,
        user_id: &str,
        input: UpdateNotificationSettingsInput,
    ) -> AppResult<NotificationSettingsResponse> {
        // Ensure the row exists before updating it
        let _ = self.repo.get_or_create(user_id).await?;

        let mut model = notification_settings::ActiveModel {
            user_id: Set(user_id.to_string()),
            updated_at: Set(Some(Utc::now().into())),
            ..Default::default()
        };

        if let Some(delivery_method) = input.delivery_method {
            if !DELIVERY_METHODS.contains(&delivery_method.as_str()) {
                return Err(AppError::Validation(format!(
                    "deliveryMethod must be one of: {}",
                    DELIVERY_METHODS.join(", ")
                )));
            }
            model.delivery_method = Set(delivery_method);
        }
        if let Some(v) = input.notify_visit_scheduled {
            model.notify_visit_scheduled = Set(v);
        }
        if let Some(v) = input.notify_visit_reminder {
            model.notify_visit_reminder = Set(v);
        }
        if let Some(v) = input.notify_visit_cancelled {
            model.notify_visit_cancelled = Set(v);
        }
        if let Some(v) = input.notify_system {
            model.notify_system = Set(v);
        }
        if let Some(v) = input.is_active {
            model.is_active = Set(v);
        }

        let updated = self.repo.update(model).await?;
        Ok(to_response(updated))
    }
}

fn to_response(model: notification_settings::Model) -> NotificationSettingsResponse {
    NotificationSettingsResponse {
        delivery_method: model.delivery_method,
        notify_visit_scheduled: model.notify_visit_scheduled,
        notify_visit_reminder: model.notify_visit_reminder,
        notify_visit_cancelled: model.notify_visit_cancelled,
        notify_system: model.notify_system,
        is_active: model.is_active,
    }
}
