//! Dedup archive handlers.

use crate::api::AppState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;

/// GET /archive - List archived identifiers
///
/// Returns every identifier recorded in the dedup archive, sorted, along
/// with the total count. Items whose identifier appears here are skipped
/// before dispatch.
#[utoipa::path(
    get,
    path = "/api/v1/archive",
    tag = "archive",
    responses(
        (status = 200, description = "Archived identifiers, sorted"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_archive(State(state): State<AppState>) -> impl IntoResponse {
    let identifiers = state.downloader.archive_identifiers().await;
    let total = identifiers.len();

    (
        StatusCode::OK,
        Json(json!({
            "identifiers": identifiers,
            "total": total,
            "path": state.config.archive_path()
        })),
    )
}

/// DELETE /archive - Clear the dedup archive
///
/// Truncates the archive file and empties the in-memory set. Previously
/// downloaded identifiers become eligible for download again.
#[utoipa::path(
    delete,
    path = "/api/v1/archive",
    tag = "archive",
    responses(
        (status = 200, description = "Number of identifiers removed"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn clear_archive(State(state): State<AppState>) -> impl IntoResponse {
    match state.downloader.clear_archive().await {
        Ok(removed) => (StatusCode::OK, Json(json!({"removed": removed}))).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to clear archive");
            e.into_response()
        }
    }
}
