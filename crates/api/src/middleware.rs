//! API middleware.

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};

use farmvisit_core::{
    CleanupService, NotificationSettingsService, SubscriptionService, VapidService,
};
use farmvisit_db::repositories::UserRepository;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    /// User lookup for authentication.
    pub user_repo: UserRepository,
    /// Key custodian.
    pub vapid_service: VapidService,
    /// Subscription registrar.
    pub subscription_service: SubscriptionService,
    /// Reconciliation manager.
    pub cleanup_service: CleanupService,
    /// Per-user notification preferences.
    pub settings_service: NotificationSettingsService,
}

/// Authentication middleware.
///
/// Resolves the bearer token to a user and stashes the model in request
/// extensions; extractors decide whether a missing user is an error.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(auth_header) = req.headers().get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
        && let Ok(Some(user)) = state.user_repo.find_by_token(token).await
        && !user.is_suspended
    {
        req.extensions_mut().insert(user);
    }

    next.run(req).await
}
