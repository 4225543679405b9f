//! Push subscription repository.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};

use crate::entities::push_subscription::{ActiveModel, Column, Entity, Model};
use farmvisit_common::{AppError, AppResult};

/// Repository for push subscription operations.
#[derive(Clone)]
pub struct PushSubscriptionRepository {
    db: Arc<DatabaseConnection>,
}

impl PushSubscriptionRepository {
    /// Create a new push subscription repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a push subscription by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<Model>> {
        Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a push subscription by ID or return an error.
    pub async fn get_by_id(&self, id: &str) -> AppResult<Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::SubscriptionNotFound(id.to_string()))
    }

    /// Find a push subscription by endpoint.
    pub async fn find_by_endpoint(&self, endpoint: &str) -> AppResult<Option<Model>> {
        Entity::find()
            .filter(Column::Endpoint.eq(endpoint))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find the subscription registered by a specific device of a user.
    pub async fn find_by_user_and_device(
        &self,
        user_id: &str,
        device_id: &str,
    ) -> AppResult<Option<Model>> {
        Entity::find()
            .filter(Column::UserId.eq(user_id))
            .filter(Column::DeviceId.eq(device_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find all active subscriptions for a user.
    pub async fn find_by_user_id(&self, user_id: &str) -> AppResult<Vec<Model>> {
        Entity::find()
            .filter(Column::UserId.eq(user_id))
            .filter(Column::IsActive.eq(true))
            .order_by_desc(Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find all subscriptions, oldest first (for reconciliation sweeps).
    pub async fn find_all(&self) -> AppResult<Vec<Model>> {
        Entity::find()
            .order_by_asc(Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a subscription, or update the existing row for the same
    /// (user, device) pair in a single atomic statement.
    ///
    /// A freshly inserted row comes back with `updated_at` NULL; the conflict
    /// arm always sets it, so callers can distinguish insert from update
    /// without a second query.
    pub async fn upsert(&self, subscription: ActiveModel) -> AppResult<Model> {
        Entity::insert(subscription)
            .on_conflict(
                OnConflict::columns([Column::UserId, Column::DeviceId])
                    .update_columns([
                        Column::Endpoint,
                        Column::P256dh,
                        Column::Auth,
                        Column::FarmId,
                        Column::UserAgent,
                        Column::IsActive,
                        Column::ConsecutiveFailureCount,
                        Column::LastValidatedAt,
                    ])
                    .value(Column::UpdatedAt, Utc::now())
                    .to_owned(),
            )
            .exec_with_returning(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a push subscription.
    pub async fn update(&self, subscription: ActiveModel) -> AppResult<Model> {
        subscription
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a push subscription by ID.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Entity::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete the subscription matching an endpoint, scoped to its owner.
    ///
    /// Returns the number of rows removed (0 when no match exists).
    pub async fn delete_by_endpoint(&self, user_id: &str, endpoint: &str) -> AppResult<u64> {
        let result = Entity::delete_many()
            .filter(Column::UserId.eq(user_id))
            .filter(Column::Endpoint.eq(endpoint))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }

    /// Delete all subscriptions for a user.
    pub async fn delete_by_user(&self, user_id: &str) -> AppResult<u64> {
        let result = Entity::delete_many()
            .filter(Column::UserId.eq(user_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }

    /// Increment the consecutive failure count for a subscription,
    /// deactivating it once the count reaches `threshold`.
    pub async fn increment_failure(&self, id: &str, threshold: u32) -> AppResult<Model> {
        let subscription = self.get_by_id(id).await?;
        let new_count = subscription.consecutive_failure_count + 1;
        let mut active: ActiveModel = subscription.into();

        active.consecutive_failure_count = Set(new_count);
        active.updated_at = Set(Some(Utc::now().into()));

        if new_count >= i32::try_from(threshold).unwrap_or(i32::MAX) {
            active.is_active = Set(false);
        }

        self.update(active).await
    }

    /// Reset the failure count and record a successful validation.
    pub async fn mark_validated(&self, id: &str) -> AppResult<Model> {
        let subscription = self.get_by_id(id).await?;
        let mut active: ActiveModel = subscription.into();

        active.consecutive_failure_count = Set(0);
        active.last_validated_at = Set(Some(Utc::now().into()));
        active.updated_at = Set(Some(Utc::now().into()));

        self.update(active).await
    }

    /// Hard-delete inactive subscriptions untouched since `cutoff`.
    pub async fn purge_inactive(
        &self,
        cutoff: chrono::DateTime<chrono::FixedOffset>,
    ) -> AppResult<u64> {
        let result = Entity::delete_many()
            .filter(Column::IsActive.eq(false))
            .filter(
                Condition::any().add(Column::UpdatedAt.lt(cutoff)).add(
                    Condition::all()
                        .add(Column::UpdatedAt.is_null())
                        .add(Column::CreatedAt.lt(cutoff)),
                ),
            )
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }

    /// Count subscriptions for a user.
    pub async fn count_by_user(&self, user_id: &str) -> AppResult<u64> {
        Entity::find()
            .filter(Column::UserId.eq(user_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn test_subscription(user_id: &str, device_id: &str) -> Model {
        Model {
            id: "01jmsubscription0000000001".to_string(),
            user_id: user_id.to_string(),
            device_id: device_id.to_string(),
            farm_id: None,
            endpoint: "https://push.example.com/send/abc123".to_string(),
            p256dh: "BPubKeyMaterial".to_string(),
            auth: "AuthSecret".to_string(),
            user_agent: Some("Mozilla/5.0".to_string()),
            is_active: true,
            consecutive_failure_count: 0,
            last_validated_at: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_find_by_endpoint_found() {
        let subscription = test_subscription("user1", "Chrome_Windows_desktop");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[subscription.clone()]])
                .into_connection(),
        );

        let repo = PushSubscriptionRepository::new(db);
        let result = repo
            .find_by_endpoint("https://push.example.com/send/abc123")
            .await
            .unwrap();

        assert!(result.is_some());
        assert_eq!(result.unwrap().device_id, "Chrome_Windows_desktop");
    }

    #[tokio::test]
    async fn test_find_by_endpoint_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<Model>::new()])
                .into_connection(),
        );

        let repo = PushSubscriptionRepository::new(db);
        let result = repo.find_by_endpoint("https://push.example.com/gone").await.unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_upsert_insert_leaves_updated_at_null() {
        let inserted = test_subscription("user1", "Chrome_Windows_desktop");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[inserted.clone()]])
                .into_connection(),
        );

        let repo = PushSubscriptionRepository::new(db);
        let active: ActiveModel = inserted.into();
        let row = repo.upsert(active).await.unwrap();

        assert!(row.updated_at.is_none());
    }

    #[tokio::test]
    async fn test_upsert_update_sets_updated_at() {
        let mut updated = test_subscription("user1", "Chrome_Windows_desktop");
        updated.updated_at = Some(Utc::now().into());

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[updated.clone()]])
                .into_connection(),
        );

        let repo = PushSubscriptionRepository::new(db);
        let active: ActiveModel = test_subscription("user1", "Chrome_Windows_desktop").into();
        let row = repo.upsert(active).await.unwrap();

        assert!(row.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_delete_by_endpoint_reports_rows_affected() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let repo = PushSubscriptionRepository::new(db);
        let removed = repo
            .delete_by_endpoint("user1", "https://push.example.com/send/abc123")
            .await
            .unwrap();

        assert_eq!(removed, 1);
    }

    #[tokio::test]
    async fn test_delete_by_endpoint_no_match() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
        );

        let repo = PushSubscriptionRepository::new(db);
        let removed = repo
            .delete_by_endpoint("user1", "https://push.example.com/unknown")
            .await
            .unwrap();

        assert_eq!(removed, 0);
    }
}
