//! Notification settings entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Per-user notification preferences.
///
/// Read by the delivery component when fanning out messages; this system only
/// persists the record.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notification_settings")]
pub struct Model {
    /// User ID (one settings row per user)
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,

    /// Delivery method: "push", "email" or "none"
    pub delivery_method: String,

    /// Notify when a visit is scheduled
    #[sea_orm(default_value = true)]
    pub notify_visit_scheduled: bool,

    /// Notify shortly before a scheduled visit
    #[sea_orm(default_value = true)]
    pub notify_visit_reminder: bool,

    /// Notify when a visit is cancelled or rescheduled
    #[sea_orm(default_value = true)]
    pub notify_visit_cancelled: bool,

    /// Notify on system announcements
    #[sea_orm(default_value = false)]
    pub notify_system: bool,

    /// Whether notifications are enabled at all
    #[sea_orm(default_value = true)]
    pub is_active: bool,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
