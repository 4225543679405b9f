//! Client-side error taxonomy.
//!
//! Errors are grouped into kinds so callers can decide whether retrying makes
//! sense without matching on individual variants.

use thiserror::Error;

/// Convenience result alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Broad failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The browser cannot do push at all. Terminal, never retry.
    Capability,
    /// Blocked by the user. Remediated only by user action outside this code.
    Permission,
    /// Deployment state (missing keys). Surfaced, not retried.
    Configuration,
    /// Safe to retry with backoff.
    Transient,
    /// The caller became irrelevant mid-operation.
    Cancelled,
}

/// Where to send the user when permission is denied at the platform level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemediationGuidance {
    /// Safari on iOS requires the app to be added to the home screen first.
    SafariIos,
    /// Generic mobile browser settings path.
    Mobile,
    /// Desktop browser site-settings path.
    Desktop,
}

impl RemediationGuidance {
    /// Pick guidance from a user agent string.
    #[must_use]
    pub fn for_user_agent(user_agent: &str) -> Self {
        let is_ios = user_agent.contains("iPhone") || user_agent.contains("iPad");
        if is_ios && user_agent.contains("Safari") && !user_agent.contains("CriOS") {
            Self::SafariIos
        } else if is_ios || user_agent.contains("Android") || user_agent.contains("Mobile") {
            Self::Mobile
        } else {
            Self::Desktop
        }
    }

    /// Human-readable remediation text.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::SafariIos => {
                "Add this site to your home screen, then enable notifications from the installed app"
            }
            Self::Mobile => "Enable notifications for this site in your browser settings",
            Self::Desktop => {
                "Click the lock icon in the address bar and allow notifications for this site"
            }
        }
    }
}

/// Everything the client surface can fail with.
///
/// Clone is required because in-flight results are shared between coalesced
/// callers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClientError {
    /// This browser has no push support.
    #[error("push notifications are not supported by this browser")]
    UnsupportedBrowser,

    /// Permission is denied at the platform level.
    #[error("notification permission is denied")]
    PermissionDenied {
        /// How the user can unblock it.
        guidance: RemediationGuidance,
    },

    /// The prompt was shown and closed without a decision.
    #[error("notification permission prompt was dismissed")]
    PermissionDismissed,

    /// The server has no VAPID key available.
    #[error("push key is not configured on the server")]
    VapidKeyMissing,

    /// No active service worker within the acquisition deadline.
    #[error("service worker did not become active")]
    WorkerNotActive,

    /// Server request failed.
    #[error("api request failed: {0}")]
    Api(String),

    /// Platform call failed (registration, subscribe, notification display).
    #[error("platform call failed: {0}")]
    Platform(String),

    /// A newer caller took over; discard this result.
    #[error("operation superseded")]
    Superseded,
}

impl ClientError {
    /// The broad category this error belongs to.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedBrowser => ErrorKind::Capability,
            Self::PermissionDenied { .. } => ErrorKind::Permission,
            Self::VapidKeyMissing => ErrorKind::Configuration,
            // Dismissal is not a decision; the next caller may prompt again.
            Self::PermissionDismissed
            | Self::WorkerNotActive
            | Self::Api(_)
            | Self::Platform(_) => ErrorKind::Transient,
            Self::Superseded => ErrorKind::Cancelled,
        }
    }

    /// Stable machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedBrowser => "UNSUPPORTED_BROWSER",
            Self::PermissionDenied { .. } => "PERMISSION_DENIED",
            Self::PermissionDismissed => "PERMISSION_DISMISSED",
            Self::VapidKeyMissing => "VAPID_KEY_MISSING",
            Self::WorkerNotActive => "WORKER_NOT_ACTIVE",
            Self::Api(_) => "API_ERROR",
            Self::Platform(_) => "PLATFORM_ERROR",
            Self::Superseded => "SUPERSEDED",
        }
    }

    /// Whether the caller may retry with backoff.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Transient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denied_is_permission_kind_and_not_retryable() {
        let err = ClientError::PermissionDenied {
            guidance: RemediationGuidance::Desktop,
        };
        assert_eq!(err.kind(), ErrorKind::Permission);
        assert!(!err.is_retryable());
        assert_eq!(err.code(), "PERMISSION_DENIED");
    }

    #[test]
    fn worker_not_active_is_retryable() {
        assert!(ClientError::WorkerNotActive.is_retryable());
    }

    #[test]
    fn dismissed_prompt_is_retryable_unlike_denied() {
        assert!(ClientError::PermissionDismissed.is_retryable());
    }

    #[test]
    fn guidance_prefers_safari_ios() {
        let ua = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) \
                  AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/604.1";
        assert_eq!(
            RemediationGuidance::for_user_agent(ua),
            RemediationGuidance::SafariIos
        );
    }

    #[test]
    fn guidance_chrome_on_ios_is_mobile() {
        let ua = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) \
                  AppleWebKit/605.1.15 (KHTML, like Gecko) CriOS/120.0 Mobile/15E148 Safari/604.1";
        assert_eq!(
            RemediationGuidance::for_user_agent(ua),
            RemediationGuidance::Mobile
        );
    }

    #[test]
    fn guidance_defaults_to_desktop() {
        let ua = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 Chrome/120.0";
        assert_eq!(
            RemediationGuidance::for_user_agent(ua),
            RemediationGuidance::Desktop
        );
    }
}
