//! VAPID key pair repository.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, NotSet, QueryFilter, Set};

use crate::entities::vapid_key::{ActiveModel, Column, Entity, Model};
use farmvisit_common::{AppError, AppResult};

/// Singleton ID for the server key pair row
pub const VAPID_KEY_ID: &str = "instance";

/// Repository for the server-wide VAPID key pair.
#[derive(Clone)]
pub struct VapidKeyRepository {
    db: Arc<DatabaseConnection>,
}

impl VapidKeyRepository {
    /// Create a new VAPID key repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find the stored key pair, if one exists.
    pub async fn find(&self) -> AppResult<Option<Model>> {
        Entity::find()
            .filter(Column::Id.eq(VAPID_KEY_ID))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Store a key pair, overwriting any existing one in place.
    ///
    /// Existing subscriptions are not cascaded; they keep failing lazily on
    /// delivery until the device resubscribes with the new public key.
    pub async fn replace(&self, public_key: &str, private_key: &str) -> AppResult<Model> {
        let now = Utc::now();
        let model = ActiveModel {
            id: Set(VAPID_KEY_ID.to_string()),
            public_key: Set(public_key.to_string()),
            private_key: Set(private_key.to_string()),
            created_at: Set(now.into()),
            updated_at: NotSet,
        };

        Entity::insert(model)
            .on_conflict(
                OnConflict::column(Column::Id)
                    .update_columns([Column::PublicKey, Column::PrivateKey])
                    .value(Column::UpdatedAt, now)
                    .to_owned(),
            )
            .exec_with_returning(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
