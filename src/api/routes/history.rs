//! Session history handlers.

use super::HistoryQuery;
use crate::api::AppState;
use crate::db::SessionOutcome;
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

/// GET /history - Get session history (with pagination)
#[utoipa::path(
    get,
    path = "/api/v1/history",
    tag = "history",
    params(
        ("limit" = Option<i64>, Query, description = "Maximum number of sessions to return"),
        ("offset" = Option<i64>, Query, description = "Number of sessions to skip"),
        ("outcome" = Option<String>, Query, description = "Filter by outcome (complete/failed)")
    ),
    responses(
        (status = 200, description = "Finished sessions, newest first"),
        (status = 400, description = "Invalid outcome filter"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> impl IntoResponse {
    let limit = query.limit.unwrap_or(50).clamp(1, 1000) as usize;
    let offset = query.offset.unwrap_or(0).max(0) as usize;

    let outcome_filter = match query.outcome.as_deref().map(parse_outcome) {
        None => None,
        Some(Some(outcome)) => Some(outcome),
        Some(None) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": {"code": "invalid_outcome", "message": "Invalid outcome filter. Must be 'complete' or 'failed'"}})),
            )
                .into_response();
        }
    };

    let sessions = match state.downloader.history(outcome_filter, limit, offset).await {
        Ok(sessions) => sessions,
        Err(e) => {
            tracing::error!(error = %e, "Failed to query history");
            return e.into_response();
        }
    };
    let total = match state.downloader.history_count(outcome_filter).await {
        Ok(total) => total,
        Err(e) => {
            tracing::error!(error = %e, "Failed to count history sessions");
            return e.into_response();
        }
    };

    (
        StatusCode::OK,
        Json(json!({
            "items": sessions,
            "total": total,
            "limit": limit,
            "offset": offset
        })),
    )
        .into_response()
}

fn parse_outcome(raw: &str) -> Option<SessionOutcome> {
    match raw.to_lowercase().as_str() {
        "complete" => Some(SessionOutcome::Complete),
        "failed" => Some(SessionOutcome::Failed),
        _ => None,
    }
}

/// GET /history/stats - Aggregate statistics across all sessions
#[utoipa::path(
    get,
    path = "/api/v1/history/stats",
    tag = "history",
    responses(
        (status = 200, description = "Aggregate download statistics", body = crate::types::HistoryStats),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn history_stats(State(state): State<AppState>) -> impl IntoResponse {
    match state.downloader.history_stats().await {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to compute history stats");
            e.into_response()
        }
    }
}

/// DELETE /history - Clear finished sessions
///
/// Running batches are left untouched; the dedup archive is not affected.
#[utoipa::path(
    delete,
    path = "/api/v1/history",
    tag = "history",
    responses(
        (status = 200, description = "Number of deleted sessions"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn clear_history(State(state): State<AppState>) -> impl IntoResponse {
    match state.downloader.clear_history().await {
        Ok(deleted) => (StatusCode::OK, Json(json!({"deleted": deleted}))).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to clear history");
            e.into_response()
        }
    }
}
