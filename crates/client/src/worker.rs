//! Service worker acquisition.
//!
//! Ensures exactly one worker is registered and active for the origin. A
//! worker that already controls the page with the expected script is adopted
//! as-is; a foreign worker is unregistered first. Acquisition is coalesced so
//! concurrent callers never race two registrations for the same script.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::coalesce::SingleFlight;
use crate::deadline::{Deadline, with_deadline};
use crate::error::{ClientError, ClientResult};
use crate::platform::{PlatformEvent, PushPlatform, WorkerRegistration};

/// Acquisition state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionState {
    /// No worker registered yet.
    Unregistered,
    /// Registration in flight.
    Registering,
    /// Expected worker is active.
    Active,
    /// A worker with a different script controls the page.
    ForeignWorkerDetected,
}

/// Tuning knobs for worker acquisition and monitoring.
#[derive(Debug, Clone)]
pub struct WorkerOptions {
    /// Script URL of the expected worker.
    pub script_url: String,
    /// How long to wait for the platform readiness signal before falling
    /// back to a direct registration lookup.
    pub ready_timeout: Duration,
    /// Interval between background update checks.
    pub update_poll_interval: Duration,
    /// Delay before the one-shot reload after a new worker installs.
    pub reload_delay: Duration,
}

impl WorkerOptions {
    /// Defaults for a given worker script.
    #[must_use]
    pub fn new(script_url: impl Into<String>) -> Self {
        Self {
            script_url: script_url.into(),
            ready_timeout: Duration::from_secs(10),
            update_poll_interval: Duration::from_secs(60 * 60),
            reload_delay: Duration::from_secs(2),
        }
    }
}

/// Owns worker registration and keeps it fresh.
pub struct WorkerController {
    platform: Arc<dyn PushPlatform>,
    options: WorkerOptions,
    acquisition: SingleFlight<ClientResult<WorkerRegistration>>,
    state: std::sync::Mutex<AcquisitionState>,
    monitoring_started: AtomicBool,
    reload_scheduled: AtomicBool,
}

impl WorkerController {
    /// Create a controller for the given platform and options.
    #[must_use]
    pub fn new(platform: Arc<dyn PushPlatform>, options: WorkerOptions) -> Self {
        Self {
            platform,
            options,
            acquisition: SingleFlight::new(),
            state: std::sync::Mutex::new(AcquisitionState::Unregistered),
            monitoring_started: AtomicBool::new(false),
            reload_scheduled: AtomicBool::new(false),
        }
    }

    /// Current acquisition state.
    pub fn state(&self) -> AcquisitionState {
        *lock_state(&self.state)
    }

    /// Ensure the expected worker is registered and active.
    ///
    /// Concurrent calls are coalesced into one acquisition. Always attaches
    /// update monitoring, whether the worker was adopted or freshly
    /// registered.
    pub async fn acquire(self: &Arc<Self>) -> ClientResult<WorkerRegistration> {
        let this = Arc::clone(self);
        let result = self
            .acquisition
            .run(move || async move { this.acquire_inner().await })
            .await;
        if result.is_ok() {
            self.start_monitoring();
        }
        result
    }

    async fn acquire_inner(&self) -> ClientResult<WorkerRegistration> {
        if let Some(controlling) = self.platform.controlling_registration().await {
            if controlling.script_url == self.options.script_url && controlling.is_active() {
                tracing::debug!(script = %self.options.script_url, "Adopting active worker");
                self.set_state(AcquisitionState::Active);
                return Ok(controlling);
            }
            if controlling.script_url != self.options.script_url {
                tracing::info!(
                    found = %controlling.script_url,
                    expected = %self.options.script_url,
                    "Unregistering foreign worker"
                );
                self.set_state(AcquisitionState::ForeignWorkerDetected);
                self.platform
                    .unregister_worker(&controlling.script_url)
                    .await?;
            }
        }

        self.set_state(AcquisitionState::Registering);
        self.platform.register_worker(&self.options.script_url).await?;

        let registration = self.await_active().await;
        self.set_state(match registration {
            Ok(_) => AcquisitionState::Active,
            Err(_) => AcquisitionState::Unregistered,
        });
        registration
    }

    /// Wait for an active worker, racing the readiness signal against the
    /// configured deadline. The readiness promise does not resolve on every
    /// browser, so a timeout falls back to a direct registration lookup.
    async fn await_active(&self) -> ClientResult<WorkerRegistration> {
        match with_deadline(self.options.ready_timeout, self.platform.ready()).await {
            Deadline::Completed(Ok(registration)) if registration.is_active() => {
                return Ok(registration);
            }
            Deadline::Completed(Ok(_)) | Deadline::Completed(Err(_)) => {}
            Deadline::TimedOut => {
                tracing::warn!(
                    timeout_secs = self.options.ready_timeout.as_secs(),
                    "Worker readiness signal did not resolve, falling back to lookup"
                );
            }
        }

        match self.platform.get_registration(&self.options.script_url).await {
            Some(registration) if registration.is_active() => Ok(registration),
            _ => Err(ClientError::WorkerNotActive),
        }
    }

    /// Attach update monitoring once per controller.
    ///
    /// Watches for a new worker version installing while an old one still
    /// controls the page and schedules a single delayed reload so the new
    /// version can take over. Also polls for updates on an interval and on
    /// focus or connectivity-restore events.
    fn start_monitoring(self: &Arc<Self>) {
        if self.monitoring_started.swap(true, Ordering::SeqCst) {
            return;
        }
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let mut events = this.platform.events();
            let mut poll = tokio::time::interval(this.options.update_poll_interval);
            poll.tick().await; // first tick fires immediately
            loop {
                tokio::select! {
                    event = events.recv() => match event {
                        Ok(PlatformEvent::WorkerInstalled { script_url }) => {
                            this.on_worker_installed(&script_url).await;
                        }
                        Ok(PlatformEvent::Focus | PlatformEvent::Online) => {
                            if let Err(e) = this.platform.check_for_update().await {
                                tracing::debug!(error = %e, "Update check failed");
                            }
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {}
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    },
                    _ = poll.tick() => {
                        if let Err(e) = this.platform.check_for_update().await {
                            tracing::debug!(error = %e, "Update check failed");
                        }
                    }
                }
            }
        });
    }

    async fn on_worker_installed(self: &Arc<Self>, script_url: &str) {
        if script_url != self.options.script_url {
            return;
        }
        let old_controller_active = self
            .platform
            .controlling_registration()
            .await
            .is_some();
        if !old_controller_active {
            return;
        }
        // One reload per controller lifetime.
        if self.reload_scheduled.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::info!("New worker version installed, scheduling reload");
        // Delay on its own task; the event loop keeps draining meanwhile.
        let this = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(this.options.reload_delay).await;
            this.platform.reload_page().await;
        });
    }

    fn set_state(&self, state: AcquisitionState) {
        *lock_state(&self.state) = state;
    }
}

fn lock_state(
    state: &std::sync::Mutex<AcquisitionState>,
) -> std::sync::MutexGuard<'_, AcquisitionState> {
    state
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}
