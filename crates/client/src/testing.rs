//! Fakes shared by the unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use tokio::sync::broadcast;

use crate::error::{ClientError, ClientResult};
use crate::platform::{
    PermissionState, PlatformEvent, PushPlatform, PushSubscriptionData, SubscriptionKeys,
    WorkerRegistration, WorkerState,
};
use crate::registrar::{CleanupOutcome, RegisterRequest, RegisterResponse, SubscriptionApi};

/// A syntactically valid VAPID public key (65 bytes, base64url).
pub fn fake_vapid_key() -> String {
    let mut point = [4u8; 65];
    for (i, byte) in point.iter_mut().enumerate() {
        *byte = i as u8;
    }
    point[0] = 0x04;
    URL_SAFE_NO_PAD.encode(point)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Scriptable in-memory browser surface.
pub struct FakePlatform {
    supported: AtomicBool,
    permission: Mutex<PermissionState>,
    prompt_result: Mutex<PermissionState>,
    prompt_calls: AtomicUsize,
    user_agent: Mutex<String>,
    controlling: Mutex<Option<WorkerRegistration>>,
    registered: Mutex<Option<WorkerRegistration>>,
    register_calls: AtomicUsize,
    unregister_calls: AtomicUsize,
    ready_hangs: AtomicBool,
    registration_activates: AtomicBool,
    subscription: Mutex<Option<PushSubscriptionData>>,
    subscribe_calls: AtomicUsize,
    update_checks: AtomicUsize,
    reload_calls: AtomicUsize,
    events_tx: broadcast::Sender<PlatformEvent>,
}

impl Default for FakePlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl FakePlatform {
    pub fn new() -> Self {
        let (events_tx, _) = broadcast::channel(16);
        Self {
            supported: AtomicBool::new(true),
            permission: Mutex::new(PermissionState::Granted),
            prompt_result: Mutex::new(PermissionState::Granted),
            prompt_calls: AtomicUsize::new(0),
            user_agent: Mutex::new("FakeAgent/1.0".to_string()),
            controlling: Mutex::new(None),
            registered: Mutex::new(None),
            register_calls: AtomicUsize::new(0),
            unregister_calls: AtomicUsize::new(0),
            ready_hangs: AtomicBool::new(false),
            registration_activates: AtomicBool::new(true),
            subscription: Mutex::new(None),
            subscribe_calls: AtomicUsize::new(0),
            update_checks: AtomicUsize::new(0),
            reload_calls: AtomicUsize::new(0),
            events_tx,
        }
    }

    pub fn set_supported(&self, supported: bool) {
        self.supported.store(supported, Ordering::SeqCst);
    }

    pub fn set_permission(&self, state: PermissionState) {
        *lock(&self.permission) = state;
    }

    pub fn set_prompt_result(&self, state: PermissionState) {
        *lock(&self.prompt_result) = state;
    }

    pub fn set_user_agent(&self, user_agent: &str) {
        *lock(&self.user_agent) = user_agent.to_string();
    }

    pub fn set_controlling(&self, registration: Option<WorkerRegistration>) {
        *lock(&self.controlling) = registration;
    }

    /// When set, `ready()` never resolves, like browsers where the readiness
    /// promise does not fire.
    pub fn set_ready_hangs(&self, hangs: bool) {
        self.ready_hangs.store(hangs, Ordering::SeqCst);
    }

    /// When false, registered workers stay in the installing state.
    pub fn set_registration_activates(&self, activates: bool) {
        self.registration_activates.store(activates, Ordering::SeqCst);
    }

    pub fn clear_subscription(&self) {
        lock(&self.subscription).take();
    }

    pub fn emit(&self, event: PlatformEvent) {
        let _ = self.events_tx.send(event);
    }

    pub fn prompt_calls(&self) -> usize {
        self.prompt_calls.load(Ordering::SeqCst)
    }

    pub fn register_calls(&self) -> usize {
        self.register_calls.load(Ordering::SeqCst)
    }

    pub fn unregister_calls(&self) -> usize {
        self.unregister_calls.load(Ordering::SeqCst)
    }

    pub fn subscribe_calls(&self) -> usize {
        self.subscribe_calls.load(Ordering::SeqCst)
    }

    pub fn update_checks(&self) -> usize {
        self.update_checks.load(Ordering::SeqCst)
    }

    pub fn reload_calls(&self) -> usize {
        self.reload_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PushPlatform for FakePlatform {
    fn is_supported(&self) -> bool {
        self.supported.load(Ordering::SeqCst)
    }

    async fn permission_state(&self) -> PermissionState {
        if !self.is_supported() {
            return PermissionState::Unsupported;
        }
        *lock(&self.permission)
    }

    async fn request_permission(&self) -> ClientResult<PermissionState> {
        self.prompt_calls.fetch_add(1, Ordering::SeqCst);
        let decision = *lock(&self.prompt_result);
        *lock(&self.permission) = decision;
        Ok(decision)
    }

    fn user_agent(&self) -> String {
        lock(&self.user_agent).clone()
    }

    async fn controlling_registration(&self) -> Option<WorkerRegistration> {
        lock(&self.controlling).clone()
    }

    async fn get_registration(&self, script_url: &str) -> Option<WorkerRegistration> {
        lock(&self.registered)
            .clone()
            .filter(|r| r.script_url == script_url)
            .or_else(|| {
                lock(&self.controlling)
                    .clone()
                    .filter(|r| r.script_url == script_url)
            })
    }

    async fn register_worker(&self, script_url: &str) -> ClientResult<WorkerRegistration> {
        // Yield so concurrent acquisitions overlap, as real registration does.
        tokio::task::yield_now().await;
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        let state = if self.registration_activates.load(Ordering::SeqCst) {
            WorkerState::Active
        } else {
            WorkerState::Installing
        };
        let registration = WorkerRegistration {
            script_url: script_url.to_string(),
            state,
            controlling: false,
        };
        *lock(&self.registered) = Some(registration.clone());
        Ok(registration)
    }

    async fn unregister_worker(&self, script_url: &str) -> ClientResult<()> {
        self.unregister_calls.fetch_add(1, Ordering::SeqCst);
        let mut controlling = lock(&self.controlling);
        if controlling
            .as_ref()
            .is_some_and(|r| r.script_url == script_url)
        {
            controlling.take();
        }
        Ok(())
    }

    async fn ready(&self) -> ClientResult<WorkerRegistration> {
        if self.ready_hangs.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        lock(&self.registered)
            .clone()
            .filter(WorkerRegistration::is_active)
            .ok_or(ClientError::WorkerNotActive)
    }

    async fn check_for_update(&self) -> ClientResult<()> {
        self.update_checks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn reload_page(&self) {
        self.reload_calls.fetch_add(1, Ordering::SeqCst);
    }

    async fn subscribe(&self, _vapid_public_key: &[u8]) -> ClientResult<PushSubscriptionData> {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        let subscription = PushSubscriptionData {
            endpoint: "https://push.example.com/send/fake-endpoint".to_string(),
            keys: SubscriptionKeys {
                p256dh: "BFakeClientKey".to_string(),
                auth: "FakeAuthSecret".to_string(),
            },
        };
        *lock(&self.subscription) = Some(subscription.clone());
        Ok(subscription)
    }

    async fn current_subscription(&self) -> ClientResult<Option<PushSubscriptionData>> {
        Ok(lock(&self.subscription).clone())
    }

    async fn unsubscribe(&self) -> ClientResult<bool> {
        Ok(lock(&self.subscription).take().is_some())
    }

    fn events(&self) -> broadcast::Receiver<PlatformEvent> {
        self.events_tx.subscribe()
    }
}

/// Recording in-memory server.
pub struct FakeApi {
    vapid_key: Option<String>,
    register_calls: AtomicUsize,
    devices: Mutex<Vec<String>>,
    unsubscribe_calls: AtomicUsize,
    cleanup_calls: AtomicUsize,
}

impl Default for FakeApi {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeApi {
    pub fn new() -> Self {
        Self {
            vapid_key: Some(fake_vapid_key()),
            register_calls: AtomicUsize::new(0),
            devices: Mutex::new(Vec::new()),
            unsubscribe_calls: AtomicUsize::new(0),
            cleanup_calls: AtomicUsize::new(0),
        }
    }

    /// A server with no VAPID key configured.
    pub fn without_key() -> Self {
        Self {
            vapid_key: None,
            ..Self::new()
        }
    }

    pub fn register_calls(&self) -> usize {
        self.register_calls.load(Ordering::SeqCst)
    }

    pub fn unsubscribe_calls(&self) -> usize {
        self.unsubscribe_calls.load(Ordering::SeqCst)
    }

    pub fn distinct_devices(&self) -> usize {
        lock(&self.devices).len()
    }
}

#[async_trait]
impl SubscriptionApi for FakeApi {
    async fn vapid_public_key(&self) -> ClientResult<String> {
        self.vapid_key
            .clone()
            .ok_or(ClientError::VapidKeyMissing)
    }

    async fn register(&self, request: &RegisterRequest) -> ClientResult<RegisterResponse> {
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        let mut devices = lock(&self.devices);
        let created = !devices.contains(&request.device_id);
        if created {
            devices.push(request.device_id.clone());
        }
        Ok(RegisterResponse { created })
    }

    async fn unsubscribe(&self, _endpoint: &str, _farm_id: Option<&str>) -> ClientResult<()> {
        self.unsubscribe_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn cleanup(&self, real_time_check: bool) -> ClientResult<CleanupOutcome> {
        self.cleanup_calls.fetch_add(1, Ordering::SeqCst);
        Ok(CleanupOutcome {
            cleaned_count: 0,
            valid_count: 0,
            total_checked: 0,
            check_type: if real_time_check {
                "realTime".to_string()
            } else {
                "heuristic".to_string()
            },
        })
    }
}
