//! Business logic services.

pub mod cleanup;
pub mod maintenance;
pub mod settings;
pub mod subscription;
pub mod vapid;

pub use cleanup::{CheckType, CleanupPolicy, CleanupService, CleanupSummary};
pub use maintenance::{MaintenanceConfig, spawn_maintenance};
pub use settings::{
    NotificationSettingsResponse, NotificationSettingsService, UpdateNotificationSettingsInput,
};
pub use subscription::{
    RegisterOutcome, RegisterSubscriptionInput, SubscriptionKeys, SubscriptionPayload,
    SubscriptionResponse, SubscriptionService,
};
pub use vapid::{VapidKeyPair, VapidService};
