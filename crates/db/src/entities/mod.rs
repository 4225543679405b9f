//! Database entities.

pub mod notification_settings;
pub mod push_subscription;
pub mod user;
pub mod vapid_key;

pub use notification_settings::Entity as NotificationSettings;
pub use push_subscription::Entity as PushSubscription;
pub use user::Entity as User;
pub use vapid_key::Entity as VapidKey;
