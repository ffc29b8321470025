//! Batch management handlers: submit, list, inspect, stop.

use super::{PageQuery, SubmitBatchRequest};
use crate::api::AppState;
use crate::types::BatchId;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

/// POST /batches - Submit a new batch of download requests
///
/// The body carries the raw multi-line input exactly as a user would paste it.
/// The batch is accepted, persisted, and started; the response returns the
/// initial session snapshot while items resolve in the background.
#[utoipa::path(
    post,
    path = "/api/v1/batches",
    tag = "batches",
    request_body = SubmitBatchRequest,
    responses(
        (status = 201, description = "Batch accepted and started", body = crate::types::SessionInfo),
        (status = 422, description = "No usable input lines", body = crate::error::ApiError),
        (status = 503, description = "Shutting down, not accepting new batches", body = crate::error::ApiError),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn submit_batch(
    State(state): State<AppState>,
    Json(request): Json<SubmitBatchRequest>,
) -> impl IntoResponse {
    match state
        .downloader
        .submit_batch(&request.input, request.options)
        .await
    {
        Ok(session) => (StatusCode::CREATED, Json(session)).into_response(),
        // NoInput -> 422, ShuttingDown -> 503, persistence errors -> 500
        Err(e) => e.into_response(),
    }
}

/// GET /batches - List batches, running first, then newest finished
#[utoipa::path(
    get,
    path = "/api/v1/batches",
    tag = "batches",
    params(
        ("limit" = Option<i64>, Query, description = "Maximum number of batches to return"),
        ("offset" = Option<i64>, Query, description = "Number of batches to skip")
    ),
    responses(
        (status = 200, description = "Batch listing", body = Vec<crate::types::SessionInfo>),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_batches(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> impl IntoResponse {
    let limit = query.limit.unwrap_or(50).clamp(1, 1000) as usize;
    let offset = query.offset.unwrap_or(0).max(0) as usize;

    match state.downloader.list_batches(limit, offset).await {
        Ok(sessions) => (StatusCode::OK, Json(sessions)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to list batches");
            e.into_response()
        }
    }
}

/// GET /batches/:id - Get a single batch session snapshot
#[utoipa::path(
    get,
    path = "/api/v1/batches/{id}",
    tag = "batches",
    params(
        ("id" = i64, Path, description = "Batch ID")
    ),
    responses(
        (status = 200, description = "Batch session snapshot", body = crate::types::SessionInfo),
        (status = 404, description = "Batch not found", body = crate::error::ApiError),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_batch(State(state): State<AppState>, Path(id): Path<i64>) -> impl IntoResponse {
    match state.downloader.get_batch(BatchId::new(id)).await {
        Ok(session) => (StatusCode::OK, Json(session)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /batches/:id/items - Get the per-item states of a batch
#[utoipa::path(
    get,
    path = "/api/v1/batches/{id}/items",
    tag = "batches",
    params(
        ("id" = i64, Path, description = "Batch ID")
    ),
    responses(
        (status = 200, description = "Items in submission order", body = Vec<crate::types::ItemInfo>),
        (status = 404, description = "Batch not found", body = crate::error::ApiError),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_batch_items(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    match state.downloader.get_batch_items(BatchId::new(id)).await {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /batches/:id/stop - Stop a running batch
///
/// Stopping prevents further dispatches only; items already handed to a
/// worker run to completion. Never-dispatched items resolve as failed.
#[utoipa::path(
    post,
    path = "/api/v1/batches/{id}/stop",
    tag = "batches",
    params(
        ("id" = i64, Path, description = "Batch ID")
    ),
    responses(
        (status = 202, description = "Stop requested; in-flight items finish"),
        (status = 404, description = "Batch not found", body = crate::error::ApiError),
        (status = 409, description = "Batch already finished", body = crate::error::ApiError),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn stop_batch(State(state): State<AppState>, Path(id): Path<i64>) -> impl IntoResponse {
    match state.downloader.stop_batch(BatchId::new(id)).await {
        Ok(()) => (
            StatusCode::ACCEPTED,
            Json(json!({"status": "stop requested"})),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}
