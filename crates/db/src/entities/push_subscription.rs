//! Push subscription entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Push subscription entity for Web Push notifications.
///
/// One row per (user, device) pair. A repeat subscribe from the same device
/// updates the row in place instead of inserting a duplicate, since the
/// platform may rotate the endpoint for the same installation.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "push_subscription")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// User ID
    #[sea_orm(indexed)]
    pub user_id: String,

    /// Derived device identifier (browser + OS + device class)
    pub device_id: String,

    /// Optional farm scope; opaque to this system
    #[sea_orm(nullable)]
    pub farm_id: Option<String>,

    /// Push subscription endpoint URL
    #[sea_orm(column_type = "Text")]
    pub endpoint: String,

    /// P256DH key for payload encryption
    pub p256dh: String,

    /// Auth secret for payload encryption
    pub auth: String,

    /// User agent of the device
    #[sea_orm(nullable)]
    pub user_agent: Option<String>,

    /// Whether the subscription is active
    #[sea_orm(default_value = true)]
    pub is_active: bool,

    /// Consecutive delivery failures since the last success
    #[sea_orm(default_value = 0)]
    pub consecutive_failure_count: i32,

    /// Last time the endpoint was confirmed reachable
    #[sea_orm(nullable)]
    pub last_validated_at: Option<DateTimeWithTimeZone>,

    /// Timestamp when the subscription was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the subscription was last updated
    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

/// Relations for push subscription.
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
