//! Subscription registrar.
//!
//! Persists one push subscription row per (user, device) pair. A repeat
//! subscribe from the same device is a "resubscribe": the platform may have
//! rotated the endpoint, so the existing row is updated in place by a single
//! atomic upsert rather than a lookup-then-write.

use chrono::Utc;
use sea_orm::{NotSet, Set};
use serde::{Deserialize, Serialize};
use validator::Validate;

use farmvisit_common::{AppError, AppResult};
use farmvisit_db::entities::push_subscription;
use farmvisit_db::repositories::PushSubscriptionRepository;

/// The subscription object handed over by the browser push API.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionPayload {
    /// Platform-issued delivery URL.
    #[validate(url)]
    pub endpoint: String,
    /// Encryption parameters issued with the endpoint.
    #[validate(nested)]
    pub keys: SubscriptionKeys,
}

/// Public encryption parameters of a subscription.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionKeys {
    /// Browser's P-256 ECDH public key (base64url).
    #[validate(length(min = 1))]
    pub p256dh: String,
    /// Shared auth secret (base64url).
    #[validate(length(min = 1))]
    pub auth: String,
}

/// Input for registering a subscription.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterSubscriptionInput {
    /// The platform subscription.
    #[validate(nested)]
    pub subscription: SubscriptionPayload,
    /// Derived device identifier.
    #[validate(length(min = 1))]
    pub device_id: String,
    /// Optional farm scope.
    pub farm_id: Option<String>,
}

/// A subscription row as exposed over the API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionResponse {
    /// Subscription ID.
    pub id: String,
    /// Derived device identifier.
    pub device_id: String,
    /// Farm scope, if any.
    pub farm_id: Option<String>,
    /// Endpoint URL, masked down to its host.
    pub endpoint: String,
    /// Whether the subscription is active.
    pub is_active: bool,
    /// Last successful validation, RFC 3339.
    pub last_validated_at: Option<String>,
    /// Creation timestamp, RFC 3339.
    pub created_at: String,
}

/// Result of a register call.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterOutcome {
    /// True when a new row was inserted; false on a resubscribe.
    pub created: bool,
    /// The stored subscription.
    pub subscription: SubscriptionResponse,
}

/// Subscription registrar service.
#[derive(Clone)]
pub struct SubscriptionService {
    repo: PushSubscriptionRepository,
}

impl SubscriptionService {
    /// Create a new subscription service.
    #[must_use]
    pub const fn new(repo: PushSubscriptionRepository) -> Self {
        Self { repo }
    }

    /// Register a subscription, or update the existing row for the same
    /// (user, device) pair.
    ///
    /// The write is one conditional insert-or-update, so near-simultaneous
    /// resubscribes from the same device cannot produce duplicate rows. A
    /// resubscribe resets the failure counter and reactivates the row.
    pub async fn register(
        &self,
        user_id: &str,
        input: RegisterSubscriptionInput,
        user_agent: Option<String>,
    ) -> AppResult<RegisterOutcome> {
        input.validate()?;

        let now = Utc::now();
        let model = push_subscription::ActiveModel {
            id: Set(farmvisit_common::new_id()),
            user_id: Set(user_id.to_string()),
            device_id: Set(input.device_id),
            farm_id: Set(input.farm_id),
            endpoint: Set(input.subscription.endpoint),
            p256dh: Set(input.subscription.keys.p256dh),
            auth: Set(input.subscription.keys.auth),
            user_agent: Set(user_agent),
            is_active: Set(true),
            consecutive_failure_count: Set(0),
            last_validated_at: Set(None),
            created_at: Set(now.into()),
            updated_at: NotSet,
        };

        let row = self.repo.upsert(model).await?;
        // A fresh insert leaves updated_at NULL; the conflict arm always sets it.
        let created = row.updated_at.is_none();

        tracing::info!(
            user_id = %row.user_id,
            device_id = %row.device_id,
            created,
            "Registered push subscription"
        );

        Ok(RegisterOutcome {
            created,
            subscription: to_response(row),
        })
    }

    /// Hard-delete the caller's subscription for an endpoint.
    ///
    /// Not a soft toggle: once this returns, deliveries must not target the
    /// endpoint again.
    pub async fn unsubscribe(&self, user_id: &str, endpoint: &str) -> AppResult<()> {
        let removed = self.repo.delete_by_endpoint(user_id, endpoint).await?;
        if removed == 0 {
            return Err(AppError::NotFound(
                "No subscription exists for this endpoint".to_string(),
            ));
        }

        tracing::info!(user_id = %user_id, "Removed push subscription");
        Ok(())
    }

    /// List the caller's active subscriptions.
    pub async fn list(&self, user_id: &str) -> AppResult<Vec<SubscriptionResponse>> {
        let rows = self.repo.find_by_user_id(user_id).await?;
        Ok(rows.into_iter().map(to_response).collect())
    }
}

fn to_response(model: push_subscription::Model) -> SubscriptionResponse {
    SubscriptionResponse {
        id: model.id,
        device_id: model.device_id,
        farm_id: model.farm_id,
        endpoint: mask_endpoint(&model.endpoint),
        is_active: model.is_active,
        last_validated_at: model.last_validated_at.map(|dt| dt.to_rfc3339()),
        created_at: model.created_at.to_rfc3339(),
    }
}

/// Mask an endpoint down to its host; the full URL is a delivery capability.
fn mask_endpoint(endpoint: &str) -> String {
    url::Url::parse(endpoint)
        .ok()
        .and_then(|u| u.host_str().map(|h| format!("https://{h}/***/")))
        .unwrap_or_else(|| "***".to_string())
}
