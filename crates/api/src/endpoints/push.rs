//! Push subscription endpoints.

use axum::{
    Json, Router,
    extract::State,
    http::HeaderMap,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use farmvisit_common::AppResult;
use farmvisit_core::{
    CheckType, CleanupSummary, RegisterOutcome, RegisterSubscriptionInput, SubscriptionResponse,
    VapidKeyPair,
};

use crate::{
    extractors::{AdminUser, AuthUser},
    middleware::AppState,
};

/// Public half of the VAPID pair.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VapidPublicKeyResponse {
    /// Public key (base64url).
    pub public_key: String,
}

/// Request to remove a subscription.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsubscribeRequest {
    /// Endpoint of the subscription to remove.
    pub endpoint: String,
    /// Farm scope; accepted for symmetry with registration, not used to match.
    pub farm_id: Option<String>,
}

/// Response to an unsubscribe call.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsubscribeResponse {
    /// Always true on success; failures go through the error envelope.
    pub deleted: bool,
}

/// Request to run a cleanup pass.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupRequest {
    /// Probe endpoints through the push service instead of using heuristics.
    pub real_time_check: Option<bool>,
}

/// Regenerate the VAPID key pair (admin capability).
///
/// Existing subscriptions are invalidated lazily: their rows stay, but
/// deliveries signed with the new key fail until each device resubscribes.
async fn generate_vapid(
    AdminUser(user): AdminUser,
    State(state): State<AppState>,
) -> AppResult<Json<VapidKeyPair>> {
    let pair = state.vapid_service.generate_pair().await?;
    tracing::info!(admin_id = %user.id, "VAPID key pair regenerated");
    Ok(Json(pair))
}

/// Current VAPID public key, with process-configuration fallback.
async fn get_vapid(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<VapidPublicKeyResponse>> {
    let public_key = state.vapid_service.public_key().await?;
    Ok(Json(VapidPublicKeyResponse { public_key }))
}

/// Register (or resubscribe) the caller's device.
async fn register(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<RegisterSubscriptionInput>,
) -> AppResult<Json<RegisterOutcome>> {
    let user_agent = header_value(&headers, "user-agent");
    let endpoint = input.subscription.endpoint.clone();

    match state
        .subscription_service
        .register(&user.id, input, user_agent.clone())
        .await
    {
        Ok(outcome) => Ok(Json(outcome)),
        Err(e) => {
            tracing::error!(
                user_id = %user.id,
                ip = header_value(&headers, "x-forwarded-for").as_deref().unwrap_or("-"),
                user_agent = user_agent.as_deref().unwrap_or("-"),
                endpoint = %endpoint,
                error = %e,
                "Failed to register push subscription"
            );
            Err(e)
        }
    }
}

/// List the caller's active subscriptions.
async fn list(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<SubscriptionResponse>>> {
    let subscriptions = state.subscription_service.list(&user.id).await?;
    Ok(Json(subscriptions))
}

/// Hard-delete the caller's subscription for an endpoint.
async fn unsubscribe(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<UnsubscribeRequest>,
) -> AppResult<Json<UnsubscribeResponse>> {
    state
        .subscription_service
        .unsubscribe(&user.id, &req.endpoint)
        .await?;
    Ok(Json(UnsubscribeResponse { deleted: true }))
}

/// Run a cleanup pass over all subscription rows.
async fn run_cleanup(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CleanupRequest>,
) -> AppResult<Json<CleanupSummary>> {
    let check_type = if req.real_time_check.unwrap_or(false) {
        CheckType::RealTime
    } else {
        CheckType::Heuristic
    };

    let summary = state.cleanup_service.run(check_type).await?;
    Ok(Json(summary))
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

/// Routes under `/push`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/vapid", post(generate_vapid).get(get_vapid))
        .route("/subscription", post(register).get(list).delete(unsubscribe))
        .route("/subscription/cleanup", post(run_cleanup))
}
