//! Notification settings endpoints.

use axum::{Json, Router, extract::State, routing::get};

use farmvisit_common::AppResult;
use farmvisit_core::{NotificationSettingsResponse, UpdateNotificationSettingsInput};

use crate::{extractors::AuthUser, middleware::AppState};

/// Current user's notification settings, created with defaults on first read.
async fn get_settings(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<NotificationSettingsResponse>> {
    let settings = state.settings_service.get(&user.id).await?;
    Ok(Json(settings))
}

/// Apply a partial update to the current user's notification settings.
async fn update_settings(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<UpdateNotificationSettingsInput>,
) -> AppResult<Json<NotificationSettingsResponse>> {
    let settings = state.settings_service.update(&user.id, input).await?;
    Ok(Json(settings))
}

/// Routes under `/notifications`.
pub fn router() -> Router<AppState> {
    Router::new().route("/settings", get(get_settings).post(update_settings))
}
