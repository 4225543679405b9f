//! Platform abstraction over the browser push stack.
//!
//! One trait covers the pieces of the web platform this crate drives:
//! the notification permission API, service worker registration, and the
//! push manager. Production code binds it to the real browser surface;
//! tests supply a fake.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::ClientResult;

/// Notification permission, as a four-state machine.
///
/// Explicit variants instead of nullable booleans so state handling is
/// exhaustively checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    /// The browser has no notification or push support at all.
    Unsupported,
    /// Not yet asked; a prompt may be shown.
    Default,
    /// Blocked by the user. Sticky at the platform level.
    Denied,
    /// Granted.
    Granted,
}

/// Service worker lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Install handler running.
    Installing,
    /// Installed, waiting to activate.
    Installed,
    /// Activate handler running.
    Activating,
    /// Active and able to receive push events.
    Active,
    /// Replaced or unregistered.
    Redundant,
}

/// A service worker registration as seen from the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerRegistration {
    /// Script URL the worker was registered with.
    pub script_url: String,
    /// Current lifecycle state.
    pub state: WorkerState,
    /// Whether this worker currently controls the page.
    pub controlling: bool,
}

impl WorkerRegistration {
    /// Active and controlling this page.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == WorkerState::Active
    }
}

/// Events the platform pushes at the page.
#[derive(Debug, Clone)]
pub enum PlatformEvent {
    /// A new worker version reached the installed state.
    WorkerInstalled {
        /// Script URL of the new worker.
        script_url: String,
    },
    /// The page regained focus.
    Focus,
    /// Connectivity was restored.
    Online,
}

/// Encryption keys issued alongside a push endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionKeys {
    /// Client public key (P-256, base64url).
    pub p256dh: String,
    /// Shared authentication secret (base64url).
    pub auth: String,
}

/// A push subscription as issued by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushSubscriptionData {
    /// Opaque platform-issued delivery URL.
    pub endpoint: String,
    /// Encryption parameters for payloads sent to this endpoint.
    pub keys: SubscriptionKeys,
}

/// The browser surface this crate needs.
#[async_trait]
pub trait PushPlatform: Send + Sync {
    /// Whether push is available at all in this browser.
    fn is_supported(&self) -> bool;

    /// Current permission state. Re-checked on every call, never cached.
    async fn permission_state(&self) -> PermissionState;

    /// Show the permission prompt and wait for the user's decision.
    ///
    /// Unbounded by design: the prompt is governed by the user and the
    /// platform, and wrapping it in a timeout could mask a legitimately
    /// pending prompt.
    async fn request_permission(&self) -> ClientResult<PermissionState>;

    /// The navigator's user agent string.
    fn user_agent(&self) -> String;

    /// Registration of the worker currently controlling the page, if any.
    async fn controlling_registration(&self) -> Option<WorkerRegistration>;

    /// Look up the registration for a script URL directly.
    async fn get_registration(&self, script_url: &str) -> Option<WorkerRegistration>;

    /// Register a worker for the given script URL.
    async fn register_worker(&self, script_url: &str) -> ClientResult<WorkerRegistration>;

    /// Unregister the worker for the given script URL.
    async fn unregister_worker(&self, script_url: &str) -> ClientResult<()>;

    /// Resolve once a registration has an active worker.
    ///
    /// Not guaranteed to resolve on every browser; callers race it against
    /// a deadline.
    async fn ready(&self) -> ClientResult<WorkerRegistration>;

    /// Ask the browser to check for a newer worker script.
    async fn check_for_update(&self) -> ClientResult<()>;

    /// Reload the page so a waiting worker can take control.
    async fn reload_page(&self);

    /// Subscribe to push with the given VAPID public key (raw bytes).
    async fn subscribe(&self, vapid_public_key: &[u8]) -> ClientResult<PushSubscriptionData>;

    /// The current push subscription, if one exists.
    async fn current_subscription(&self) -> ClientResult<Option<PushSubscriptionData>>;

    /// Drop the platform-side push subscription. Returns whether one existed.
    async fn unsubscribe(&self) -> ClientResult<bool>;

    /// Subscribe to platform events (worker installs, focus, connectivity).
    fn events(&self) -> broadcast::Receiver<PlatformEvent>;
}
