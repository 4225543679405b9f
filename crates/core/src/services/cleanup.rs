//! Reconciliation of stale push subscriptions.
//!
//! Two modes: a heuristic sweep over failure counters and validation age, and
//! a real-time probe that sends an empty VAPID-signed message to every
//! endpoint. Both are idempotent; running twice with no intervening activity
//! cleans nothing on the second pass.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use web_push::{
    ContentEncoding, SubscriptionInfo, VapidSignatureBuilder, WebPushError, WebPushMessage,
    WebPushMessageBuilder,
};

use farmvisit_common::AppResult;
use farmvisit_common::config::PushConfig;
use farmvisit_db::entities::push_subscription;
use farmvisit_db::repositories::PushSubscriptionRepository;

use super::vapid::{VapidKeyPair, VapidService};

/// How subscriptions are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CheckType {
    /// Failure-count and age heuristics; no network traffic.
    Heuristic,
    /// Probe every endpoint through the push service.
    RealTime,
}

/// Removal policy for the heuristic mode.
#[derive(Debug, Clone)]
pub struct CleanupPolicy {
    /// Failure count above which a row is removed.
    pub failure_threshold: u32,
    /// Days without validation after which a row is stale.
    pub retention_days: i64,
}

impl CleanupPolicy {
    /// Derive the policy from the push configuration.
    #[must_use]
    pub const fn from_config(config: &PushConfig) -> Self {
        Self {
            failure_threshold: config.failure_threshold,
            retention_days: config.retention_days,
        }
    }
}

/// Summary of one cleanup run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupSummary {
    /// Rows removed.
    pub cleaned_count: u64,
    /// Rows still considered deliverable.
    pub valid_count: u64,
    /// Rows examined.
    pub total_checked: u64,
    /// Mode that produced this summary.
    pub check_type: CheckType,
}

/// Outcome of probing one endpoint.
enum ProbeOutcome {
    /// The push service accepted the message.
    Reachable,
    /// The endpoint is permanently gone (or can never be used).
    Gone,
    /// A transient condition; the endpoint may recover.
    Unreachable,
}

/// Reconciliation/cleanup manager.
#[derive(Clone)]
pub struct CleanupService {
    repo: PushSubscriptionRepository,
    vapid: VapidService,
    http_client: reqwest::Client,
    policy: CleanupPolicy,
}

impl CleanupService {
    /// Create a new cleanup service.
    #[must_use]
    pub fn new(repo: PushSubscriptionRepository, vapid: VapidService, policy: CleanupPolicy) -> Self {
        Self {
            repo,
            vapid,
            http_client: reqwest::Client::new(),
            policy,
        }
    }

    /// Run one cleanup pass over every subscription row.
    pub async fn run(&self, check_type: CheckType) -> AppResult<CleanupSummary> {
        let rows = self.repo.find_all().await?;
        let total_checked = rows.len() as u64;

        let summary = match check_type {
            CheckType::Heuristic => self.run_heuristic(rows).await?,
            CheckType::RealTime => self.run_real_time(rows).await?,
        };

        tracing::info!(
            cleaned = summary.cleaned_count,
            valid = summary.valid_count,
            total = total_checked,
            check_type = ?check_type,
            "Subscription cleanup finished"
        );

        Ok(CleanupSummary {
            total_checked,
            ..summary
        })
    }

    async fn run_heuristic(
        &self,
        rows: Vec<push_subscription::Model>,
    ) -> AppResult<CleanupSummary> {
        let now = Utc::now();
        let mut cleaned_count = 0;
        let mut valid_count = 0;

        for row in rows {
            if should_remove(&row, &self.policy, now) {
                self.repo.delete(&row.id).await?;
                cleaned_count += 1;
                tracing::debug!(
                    user_id = %row.user_id,
                    device_id = %row.device_id,
                    failures = row.consecutive_failure_count,
                    "Removed stale push subscription"
                );
            } else {
                valid_count += 1;
            }
        }

        Ok(CleanupSummary {
            cleaned_count,
            valid_count,
            total_checked: 0,
            check_type: CheckType::Heuristic,
        })
    }

    async fn run_real_time(
        &self,
        rows: Vec<push_subscription::Model>,
    ) -> AppResult<CleanupSummary> {
        let pair = self.vapid.key_pair().await?;
        let mut cleaned_count = 0;
        let mut valid_count = 0;

        for row in rows {
            match self.probe(&pair, &row).await {
                ProbeOutcome::Reachable => {
                    self.repo.mark_validated(&row.id).await?;
                    valid_count += 1;
                }
                ProbeOutcome::Gone => {
                    self.repo.delete(&row.id).await?;
                    cleaned_count += 1;
                }
                ProbeOutcome::Unreachable => {
                    self.repo
                        .increment_failure(&row.id, self.policy.failure_threshold)
                        .await?;
                    valid_count += 1;
                }
            }
        }

        Ok(CleanupSummary {
            cleaned_count,
            valid_count,
            total_checked: 0,
            check_type: CheckType::RealTime,
        })
    }

    /// Probe one endpoint with an empty signed message, TTL 0.
    ///
    /// Error text from the push service is carried only in logs; branching
    /// happens on typed builder errors and response status classes.
    async fn probe(&self, pair: &VapidKeyPair, row: &push_subscription::Model) -> ProbeOutcome {
        let message = match build_probe_message(pair, self.vapid.subject(), row) {
            Ok(message) => message,
            Err(e) if is_permanent_build_failure(&e) => {
                tracing::debug!(subscription_id = %row.id, error = %e, "Endpoint can never be used");
                return ProbeOutcome::Gone;
            }
            Err(e) => {
                tracing::warn!(subscription_id = %row.id, error = %e, "Failed to build probe");
                return ProbeOutcome::Unreachable;
            }
        };

        let mut request = self
            .http_client
            .post(message.endpoint.to_string())
            .header("TTL", message.ttl.to_string());

        if let Some(payload) = message.payload {
            request = request
                .header("Content-Encoding", payload.content_encoding.to_str())
                .header("Content-Type", "application/octet-stream");
            for (key, value) in &payload.crypto_headers {
                request = request.header(*key, value.as_str());
            }
            request = request.body(payload.content);
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    ProbeOutcome::Reachable
                } else if status.as_u16() == 404 || status.as_u16() == 410 {
                    // RFC 8030: the subscription no longer exists
                    ProbeOutcome::Gone
                } else {
                    tracing::debug!(
                        subscription_id = %row.id,
                        status = %status,
                        "Probe rejected by push service"
                    );
                    ProbeOutcome::Unreachable
                }
            }
            Err(e) => {
                tracing::debug!(subscription_id = %row.id, error = %e, "Probe request failed");
                ProbeOutcome::Unreachable
            }
        }
    }
}

/// Heuristic removal decision, pure over (row, policy, now).
fn should_remove(
    row: &push_subscription::Model,
    policy: &CleanupPolicy,
    now: DateTime<Utc>,
) -> bool {
    let threshold = i32::try_from(policy.failure_threshold).unwrap_or(i32::MAX);
    if row.consecutive_failure_count > threshold {
        return true;
    }

    // Rows that never saw a probe age out from their creation time.
    let last_seen = row
        .last_validated_at
        .unwrap_or(row.created_at)
        .with_timezone(&Utc);
    now - last_seen > Duration::days(policy.retention_days)
}

fn build_probe_message(
    pair: &VapidKeyPair,
    subject: &str,
    row: &push_subscription::Model,
) -> Result<WebPushMessage, WebPushError> {
    let sub_info = SubscriptionInfo::new(&row.endpoint, &row.p256dh, &row.auth);

    let mut sig_builder = VapidSignatureBuilder::from_base64(&pair.private_key, &sub_info)?;
    sig_builder.add_claim("sub", subject);
    let signature = sig_builder.build()?;

    let mut builder = WebPushMessageBuilder::new(&sub_info);
    builder.set_payload(ContentEncoding::Aes128Gcm, b"");
    builder.set_vapid_signature(signature);
    builder.set_ttl(0);
    builder.build()
}

/// Build failures that mean the row can never receive a message.
const fn is_permanent_build_failure(error: &WebPushError) -> bool {
    matches!(
        error,
        WebPushError::InvalidUri
            | WebPushError::EndpointNotValid(_)
            | WebPushError::EndpointNotFound(_)
            | WebPushError::MissingCryptoKeys
            | WebPushError::InvalidCryptoKeys
    )
}
