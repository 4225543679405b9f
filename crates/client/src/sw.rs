//! Worker-side push event handling.
//!
//! Parses incoming push payloads and drives notification display and click
//! routing through the [`WorkerHost`] seam.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ClientResult;

/// Structured data attached to a push message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PushMessageData {
    /// URL to open or navigate to on click.
    pub url: String,
    /// Server-side send time, epoch milliseconds.
    pub timestamp: Option<i64>,
}

impl Default for PushMessageData {
    fn default() -> Self {
        Self {
            url: "/".to_string(),
            timestamp: None,
        }
    }
}

/// One push message as displayed to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PushMessage {
    /// Notification title.
    pub title: String,
    /// Notification body text.
    pub body: String,
    /// Icon URL.
    pub icon: Option<String>,
    /// Badge URL.
    pub badge: Option<String>,
    /// Collapse tag; the platform replaces a shown notification with the
    /// same tag instead of stacking duplicates.
    pub tag: String,
    /// Keep the notification on screen until dismissed.
    pub require_interaction: bool,
    /// Click target and metadata.
    pub data: PushMessageData,
}

impl Default for PushMessage {
    fn default() -> Self {
        Self {
            title: "Farm Visit".to_string(),
            body: "You have a new notification".to_string(),
            icon: None,
            badge: None,
            tag: "farmvisit".to_string(),
            require_interaction: false,
            data: PushMessageData::default(),
        }
    }
}

/// Parse a raw push payload.
///
/// Falls back to a default message carrying the plain text body when the
/// payload is not the expected JSON shape, and to the bare default when it
/// is not text at all. Receipt must never fail on a malformed payload.
#[must_use]
pub fn parse_payload(payload: &[u8]) -> PushMessage {
    if let Ok(message) = serde_json::from_slice::<PushMessage>(payload) {
        return message;
    }
    match std::str::from_utf8(payload) {
        Ok(text) if !text.trim().is_empty() => PushMessage {
            body: text.trim().to_string(),
            ..PushMessage::default()
        },
        _ => PushMessage::default(),
    }
}

/// What the worker runtime provides: notification display and window
/// management.
#[async_trait]
pub trait WorkerHost: Send + Sync {
    /// Display one notification.
    async fn show_notification(&self, message: &PushMessage) -> ClientResult<()>;

    /// URLs of the windows this worker controls.
    async fn window_urls(&self) -> Vec<String>;

    /// Focus the window at `index` and navigate it to `url`.
    async fn focus_and_navigate(&self, index: usize, url: &str) -> ClientResult<()>;

    /// Open a new window at `url`.
    async fn open_window(&self, url: &str) -> ClientResult<()>;
}

/// Push event handlers, bound to a host.
pub struct WorkerContext<H> {
    host: H,
}

impl<H: WorkerHost> WorkerContext<H> {
    /// Bind handlers to a host.
    pub const fn new(host: H) -> Self {
        Self { host }
    }

    /// Handle an incoming push message: parse and display.
    pub async fn on_push(&self, payload: &[u8]) -> ClientResult<()> {
        let message = parse_payload(payload);
        tracing::debug!(tag = %message.tag, "Displaying push notification");
        self.host.show_notification(&message).await
    }

    /// Handle a notification click: focus an existing same-origin window and
    /// navigate it to the target, or open a new one.
    pub async fn on_click(&self, message: &PushMessage) -> ClientResult<()> {
        let target = &message.data.url;
        let target_origin = Url::parse(target).ok().map(|u| u.origin());

        if let Some(target_origin) = target_origin {
            let windows = self.host.window_urls().await;
            for (index, window_url) in windows.iter().enumerate() {
                let same_origin = Url::parse(window_url)
                    .is_ok_and(|u| u.origin() == target_origin);
                if same_origin {
                    return self.host.focus_and_navigate(index, target).await;
                }
            }
        }
        self.host.open_window(target).await
    }

    /// Handle a notification close. No network effect.
    pub fn on_close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingHost {
        shown: Mutex<Vec<PushMessage>>,
        windows: Vec<String>,
        focused: Mutex<Vec<(usize, String)>>,
        opened: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl WorkerHost for RecordingHost {
        async fn show_notification(&self, message: &PushMessage) -> ClientResult<()> {
            self.shown.lock().unwrap().push(message.clone());
            Ok(())
        }

        async fn window_urls(&self) -> Vec<String> {
            self.windows.clone()
        }

        async fn focus_and_navigate(&self, index: usize, url: &str) -> ClientResult<()> {
            self.focused.lock().unwrap().push((index, url.to_string()));
            Ok(())
        }

        async fn open_window(&self, url: &str) -> ClientResult<()> {
            self.opened.lock().unwrap().push(url.to_string());
            Ok(())
        }
    }

    #[test]
    fn parses_full_json_payload() {
        let payload = br#"{
            "title": "Visit scheduled",
            "body": "Tomorrow at 10:00",
            "tag": "visit-42",
            "requireInteraction": true,
            "data": { "url": "https://farm.example.com/visits/42", "timestamp": 1700000000000 }
        }"#;
        let message = parse_payload(payload);
        assert_eq!(message.title, "Visit scheduled");
        assert_eq!(message.tag, "visit-42");
        assert!(message.require_interaction);
        assert_eq!(message.data.url, "https://farm.example.com/visits/42");
    }

    #[test]
    fn plain_text_payload_becomes_default_with_text_body() {
        let message = parse_payload(b"Your visit was confirmed");
        assert_eq!(message.body, "Your visit was confirmed");
        assert_eq!(message.title, PushMessage::default().title);
    }

    #[test]
    fn garbage_payload_falls_back_to_default() {
        assert_eq!(parse_payload(&[0xff, 0xfe, 0x00]), PushMessage::default());
        assert_eq!(parse_payload(b""), PushMessage::default());
    }

    #[tokio::test]
    async fn push_displays_one_notification() {
        let context = WorkerContext::new(RecordingHost::default());
        context.on_push(b"{\"title\":\"Hi\"}").await.unwrap();
        let shown = context.host.shown.lock().unwrap();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].title, "Hi");
    }

    #[tokio::test]
    async fn click_focuses_existing_same_origin_window() {
        let host = RecordingHost {
            windows: vec![
                "https://other.example.com/".to_string(),
                "https://farm.example.com/dashboard".to_string(),
            ],
            ..RecordingHost::default()
        };
        let context = WorkerContext::new(host);
        let message = PushMessage {
            data: PushMessageData {
                url: "https://farm.example.com/visits/42".to_string(),
                timestamp: None,
            },
            ..PushMessage::default()
        };

        context.on_click(&message).await.unwrap();
        let focused = context.host.focused.lock().unwrap();
        assert_eq!(
            focused.as_slice(),
            &[(1, "https://farm.example.com/visits/42".to_string())]
        );
        assert!(context.host.opened.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn click_opens_new_window_when_no_origin_matches() {
        let host = RecordingHost {
            windows: vec!["https://other.example.com/".to_string()],
            ..RecordingHost::default()
        };
        let context = WorkerContext::new(host);
        let message = PushMessage {
            data: PushMessageData {
                url: "https://farm.example.com/visits/42".to_string(),
                timestamp: None,
            },
            ..PushMessage::default()
        };

        context.on_click(&message).await.unwrap();
        assert!(context.host.focused.lock().unwrap().is_empty());
        assert_eq!(
            context.host.opened.lock().unwrap().as_slice(),
            &["https://farm.example.com/visits/42".to_string()]
        );
    }

    #[tokio::test]
    async fn relative_click_target_opens_window() {
        let context = WorkerContext::new(RecordingHost::default());
        let message = PushMessage::default();
        context.on_click(&message).await.unwrap();
        assert_eq!(context.host.opened.lock().unwrap().as_slice(), &["/"]);
    }
}
