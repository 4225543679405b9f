//! Repository layer over the database entities.

pub mod notification_settings;
pub mod push_subscription;
pub mod user;
pub mod vapid_key;

pub use notification_settings::NotificationSettingsRepository;
pub use push_subscription::PushSubscriptionRepository;
pub use user::UserRepository;
pub use vapid_key::{VAPID_KEY_ID, VapidKeyRepository};
