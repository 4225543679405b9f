//! Permission and subscription orchestration.
//!
//! Drives the permission state machine, obtains a platform subscription once
//! granted, and hands it to the server. Long-running flows check a
//! [`Liveness`] token after every suspension point so a caller that became
//! irrelevant mid-operation discards its result instead of mutating stale
//! state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

use crate::device;
use crate::error::{ClientError, ClientResult, RemediationGuidance};
use crate::platform::{PermissionState, PushPlatform};
use crate::registrar::{CleanupOutcome, RegisterRequest, SubscriptionApi};
use crate::worker::WorkerController;

/// Cancellation token for a long-running flow.
///
/// Cheap to clone; revoking any clone revokes all of them.
#[derive(Debug, Clone, Default)]
pub struct Liveness {
    revoked: Arc<AtomicBool>,
}

impl Liveness {
    /// A live token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the owning caller as no longer interested.
    pub fn revoke(&self) {
        self.revoked.store(true, Ordering::SeqCst);
    }

    /// Whether the owning caller still wants the result.
    #[must_use]
    pub fn is_live(&self) -> bool {
        !self.revoked.load(Ordering::SeqCst)
    }

    fn ensure(&self) -> ClientResult<()> {
        if self.is_live() {
            Ok(())
        } else {
            Err(ClientError::Superseded)
        }
    }
}

/// Result of a successful enable flow.
#[derive(Debug, Clone)]
pub struct EnableOutcome {
    /// True when the server inserted a new row, false on resubscribe.
    pub created: bool,
    /// Device id the subscription was registered under.
    pub device_id: String,
    /// Platform-issued endpoint.
    pub endpoint: String,
}

/// Coordinates permission, worker acquisition, platform subscribe, and
/// server registration.
pub struct PushOrchestrator {
    platform: Arc<dyn PushPlatform>,
    api: Arc<dyn SubscriptionApi>,
    worker: Arc<WorkerController>,
    // Cached subscription status; None forces a platform re-check.
    subscribed: tokio::sync::Mutex<Option<bool>>,
}

impl PushOrchestrator {
    /// Wire the orchestrator to its collaborators.
    #[must_use]
    pub fn new(
        platform: Arc<dyn PushPlatform>,
        api: Arc<dyn SubscriptionApi>,
        worker: Arc<WorkerController>,
    ) -> Self {
        Self {
            platform,
            api,
            worker,
            subscribed: tokio::sync::Mutex::new(None),
        }
    }

    /// Enable push for this device: walk the permission state machine,
    /// acquire a worker, subscribe, and register with the server.
    pub async fn enable(
        &self,
        farm_id: Option<String>,
        live: &Liveness,
    ) -> ClientResult<EnableOutcome> {
        if !self.platform.is_supported() {
            return Err(ClientError::UnsupportedBrowser);
        }
        self.ensure_permission(live).await?;

        let public_key = self.api.vapid_public_key().await?;
        live.ensure()?;
        let key_bytes = decode_vapid_key(&public_key)?;

        self.worker.acquire().await?;
        live.ensure()?;

        let subscription = self.platform.subscribe(&key_bytes).await?;
        live.ensure()?;

        let device_id = device::resolve_device_id(&self.platform.user_agent());
        let request = RegisterRequest {
            subscription: subscription.clone(),
            device_id: device_id.clone(),
            farm_id,
        };
        let response = self.api.register(&request).await?;
        live.ensure()?;

        tracing::info!(device_id = %device_id, created = response.created, "Push enabled");
        *self.subscribed.lock().await = Some(true);
        Ok(EnableOutcome {
            created: response.created,
            device_id,
            endpoint: subscription.endpoint,
        })
    }

    /// Disable push for this device. Returns whether a subscription existed.
    pub async fn disable(&self, farm_id: Option<&str>) -> ClientResult<bool> {
        let Some(subscription) = self.platform.current_subscription().await? else {
            *self.subscribed.lock().await = Some(false);
            return Ok(false);
        };

        self.platform.unsubscribe().await?;
        self.api
            .unsubscribe(&subscription.endpoint, farm_id)
            .await?;
        *self.subscribed.lock().await = Some(false);
        Ok(true)
    }

    /// Whether this device currently holds a platform subscription. Cached
    /// between calls; cleanup invalidates the cache.
    pub async fn subscription_status(&self) -> ClientResult<bool> {
        let mut cached = self.subscribed.lock().await;
        if let Some(status) = *cached {
            return Ok(status);
        }
        let status = self.platform.current_subscription().await?.is_some();
        *cached = Some(status);
        Ok(status)
    }

    /// Run a server-side cleanup pass. The pass may have removed this
    /// device's row, so the cached status is dropped.
    pub async fn trigger_cleanup(&self, real_time_check: bool) -> ClientResult<CleanupOutcome> {
        let outcome = self.api.cleanup(real_time_check).await?;
        self.subscribed.lock().await.take();
        Ok(outcome)
    }

    /// Walk the permission state machine to `granted` or a typed failure.
    ///
    /// `denied` is sticky at the platform level; it is never re-prompted,
    /// only reported with remediation guidance. The prompt itself is
    /// unbounded, governed by the user and the platform.
    async fn ensure_permission(&self, live: &Liveness) -> ClientResult<()> {
        match self.platform.permission_state().await {
            PermissionState::Granted => Ok(()),
            PermissionState::Unsupported => Err(ClientError::UnsupportedBrowser),
            PermissionState::Denied => Err(self.denied()),
            PermissionState::Default => {
                let decision = self.platform.request_permission().await?;
                live.ensure()?;
                match decision {
                    PermissionState::Granted => Ok(()),
                    PermissionState::Denied => Err(self.denied()),
                    // Prompt closed without a decision.
                    PermissionState::Default | PermissionState::Unsupported => {
                        Err(ClientError::PermissionDismissed)
                    }
                }
            }
        }
    }

    fn denied(&self) -> ClientError {
        ClientError::PermissionDenied {
            guidance: RemediationGuidance::for_user_agent(&self.platform.user_agent()),
        }
    }
}

fn decode_vapid_key(key: &str) -> ClientResult<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(key.trim_end_matches('='))
        .map_err(|e| ClientError::Api(format!("invalid VAPID key from server: {e}")))
}
