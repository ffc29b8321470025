//! User settings handlers.

use crate::api::AppState;
use crate::types::SettingsUpdate;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

/// GET /settings - Get the current user settings
#[utoipa::path(
    get,
    path = "/api/v1/settings",
    tag = "settings",
    responses(
        (status = 200, description = "Current user settings", body = crate::types::UserSettings),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_settings(State(state): State<AppState>) -> impl IntoResponse {
    match state.downloader.settings().await {
        Ok(settings) => (StatusCode::OK, Json(settings)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load settings");
            e.into_response()
        }
    }
}

/// PUT /settings - Update user settings
///
/// Accepts a partial update: absent fields keep their current value. The
/// response carries the full settings snapshot after the merge. Changes
/// apply to batches submitted afterwards; running batches keep the values
/// they started with.
#[utoipa::path(
    put,
    path = "/api/v1/settings",
    tag = "settings",
    request_body = crate::types::SettingsUpdate,
    responses(
        (status = 200, description = "Settings after the update", body = crate::types::UserSettings),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn update_settings(
    State(state): State<AppState>,
    Json(update): Json<SettingsUpdate>,
) -> impl IntoResponse {
    match state.downloader.update_settings(&update).await {
        Ok(settings) => (StatusCode::OK, Json(settings)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to update settings");
            e.into_response()
        }
    }
}
