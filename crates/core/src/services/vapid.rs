//! VAPID key custodian.
//!
//! Owns the server-wide P-256 key pair used to authenticate outgoing push
//! messages (RFC 8292). The pair lives in a singleton database row; the
//! `[push]` section of the process configuration acts as a deployment-level
//! fallback when no stored pair exists yet.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use p256::ecdsa::SigningKey;
use p256::elliptic_curve::rand_core::OsRng;
use serde::Serialize;

use farmvisit_common::config::PushConfig;
use farmvisit_common::{AppError, AppResult};
use farmvisit_db::repositories::VapidKeyRepository;

/// A VAPID key pair.
///
/// The public key is the uncompressed SEC1 point (65 bytes, base64url); the
/// private key is the raw 32-byte P-256 scalar (base64url). The raw scalar is
/// the format the `web-push` crate's `VapidSignatureBuilder::from_base64`
/// expects, and the uncompressed point is what browsers take as the
/// `applicationServerKey`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VapidKeyPair {
    /// Public key (base64url, 65 bytes decoded).
    pub public_key: String,
    /// Private key (base64url, 32 bytes decoded).
    pub private_key: String,
}

/// Key custodian for the server-wide VAPID pair.
#[derive(Clone)]
pub struct VapidService {
    repo: VapidKeyRepository,
    fallback: PushConfig,
}

impl VapidService {
    /// Create a new VAPID service.
    #[must_use]
    pub const fn new(repo: VapidKeyRepository, fallback: PushConfig) -> Self {
        Self { repo, fallback }
    }

    /// Generate a fresh key pair and overwrite the stored one.
    ///
    /// Existing subscriptions are NOT cascaded: they keep their rows but can
    /// no longer be authenticated against, so deliveries to them fail until
    /// each device resubscribes with the new public key. Callers regenerating
    /// the pair are responsible for triggering re-subscription.
    pub async fn generate_pair(&self) -> AppResult<VapidKeyPair> {
        let signing_key = SigningKey::random(&mut OsRng);
        let verifying_key = signing_key.verifying_key();

        // SEC1 uncompressed public key (0x04 || x || y)
        let public_key = URL_SAFE_NO_PAD.encode(verifying_key.to_encoded_point(false).as_bytes());
        let private_key = URL_SAFE_NO_PAD.encode(signing_key.to_bytes().as_slice());

        let stored = self.repo.replace(&public_key, &private_key).await?;

        tracing::info!("Regenerated VAPID key pair; existing subscriptions invalidate lazily");

        Ok(VapidKeyPair {
            public_key: stored.public_key,
            private_key: stored.private_key,
        })
    }

    /// Current public key: the stored one, else the configuration fallback.
    pub async fn public_key(&self) -> AppResult<String> {
        if let Some(stored) = self.repo.find().await? {
            return Ok(stored.public_key);
        }

        self.fallback
            .vapid_public_key
            .clone()
            .ok_or(AppError::VapidNotConfigured)
    }

    /// The full pair, for signing outgoing probes and deliveries.
    pub async fn key_pair(&self) -> AppResult<VapidKeyPair> {
        if let Some(stored) = self.repo.find().await? {
            return Ok(VapidKeyPair {
                public_key: stored.public_key,
                private_key: stored.private_key,
            });
        }

        match (
            self.fallback.vapid_public_key.clone(),
            self.fallback.vapid_private_key.clone(),
        ) {
            (Some(public_key), Some(private_key)) => Ok(VapidKeyPair {
                public_key,
                private_key,
            }),
            _ => Err(AppError::VapidNotConfigured),
        }
    }

    /// Contact URI embedded in push authentication tokens.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.fallback.vapid_subject
    }
}
