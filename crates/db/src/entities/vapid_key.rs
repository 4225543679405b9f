//! VAPID key pair entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Server-wide VAPID key pair used to authenticate outgoing push messages.
///
/// Exactly one row exists (singleton ID). Regenerating the pair overwrites it
/// in place; existing subscriptions are not touched and fail lazily on the
/// next delivery attempt until the device resubscribes.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vapid_key")]
pub struct Model {
    /// Singleton identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Public key (base64url, uncompressed P-256 point)
    #[sea_orm(column_type = "Text")]
    pub public_key: String,

    /// Private key (base64url, P-256 scalar)
    #[sea_orm(column_type = "Text")]
    pub private_key: String,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
