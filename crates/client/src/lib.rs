//! Browser-side push subscription client for farmvisit-rs.
//!
//! The platform push API (permissions, service workers, the push manager)
//! lives behind the [`platform::PushPlatform`] trait so the orchestration
//! logic can be driven and tested off-browser. The server boundary lives
//! behind [`registrar::SubscriptionApi`].

pub mod coalesce;
pub mod deadline;
pub mod device;
pub mod error;
pub mod live;
pub mod orchestrator;
pub mod platform;
pub mod registrar;
pub mod sw;
pub mod worker;

pub use coalesce::SingleFlight;
pub use deadline::{Deadline, with_deadline};
pub use device::DeviceIdentity;
pub use error::{ClientError, ClientResult, ErrorKind, RemediationGuidance};
pub use live::{LiveFeedHandle, LiveFeedRegistry};
pub use orchestrator::{EnableOutcome, Liveness, PushOrchestrator};
pub use platform::{
    PermissionState, PlatformEvent, PushPlatform, PushSubscriptionData, SubscriptionKeys,
    WorkerRegistration, WorkerState,
};
pub use registrar::{HttpSubscriptionApi, SubscriptionApi};
pub use worker::{AcquisitionState, WorkerController, WorkerOptions};

#[cfg(test)]
pub(crate) mod testing;
