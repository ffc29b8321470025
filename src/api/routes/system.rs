//! System handlers: health, capabilities, logs, OpenAPI, events, shutdown.

use super::LogsQuery;
use crate::api::AppState;
use crate::api::openapi::ApiDoc;
use crate::types::Event;
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{
        IntoResponse,
        sse::{Event as SseEvent, KeepAlive, Sse},
    },
};
use serde_json::json;
use std::convert::Infallible;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use utoipa::OpenApi;

/// GET /health - Health check
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "system",
    responses(
        (status = 200, description = "Service is healthy")
    )
)]
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// GET /capabilities - Query engine and encoder availability
#[utoipa::path(
    get,
    path = "/api/v1/capabilities",
    tag = "system",
    responses(
        (status = 200, description = "Engine availability snapshot taken at startup", body = crate::types::Capabilities),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_capabilities(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.downloader.capabilities()))
}

/// GET /logs - Most recent live log lines
#[utoipa::path(
    get,
    path = "/api/v1/logs",
    tag = "system",
    params(
        ("limit" = Option<usize>, Query, description = "Maximum number of most-recent lines to return")
    ),
    responses(
        (status = 200, description = "Buffered log lines, oldest first"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_logs(
    State(state): State<AppState>,
    Query(query): Query<LogsQuery>,
) -> impl IntoResponse {
    let lines = state
        .downloader
        .recent_logs(query.limit.unwrap_or(usize::MAX));
    (
        StatusCode::OK,
        Json(json!({"count": lines.len(), "lines": lines})),
    )
}

/// GET /openapi.json - OpenAPI specification
#[utoipa::path(
    get,
    path = "/api/v1/openapi.json",
    tag = "system",
    responses(
        (status = 200, description = "OpenAPI 3.1 specification in JSON format")
    )
)]
pub async fn openapi_spec() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

/// SSE event name for a coordinator event
fn event_name(event: &Event) -> &'static str {
    match event {
        Event::BatchStarted { .. } => "batch_started",
        Event::ItemDispatched { .. } => "item_dispatched",
        Event::ItemCompleted { .. } => "item_completed",
        Event::ItemSkipped { .. } => "item_skipped",
        Event::ItemFailed { .. } => "item_failed",
        Event::BatchStopped { .. } => "batch_stopped",
        Event::BatchCompleted { .. } => "batch_completed",
        Event::ArchiveCleared { .. } => "archive_cleared",
        Event::LogLine { .. } => "log_line",
        Event::Shutdown => "shutdown",
    }
}

/// GET /events - Server-sent events stream
///
/// Streams every coordinator event as it happens: batch lifecycle, per-item
/// outcomes, archive changes, and log lines. Each SSE event is named after
/// the variant and carries the JSON-serialized payload.
#[utoipa::path(
    get,
    path = "/api/v1/events",
    tag = "system",
    responses(
        (status = 200, description = "Server-sent events stream (text/event-stream)", content_type = "text/event-stream"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    let stream = BroadcastStream::new(state.downloader.subscribe()).filter_map(|received| {
        let sse = match received {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(payload) => SseEvent::default().event(event_name(&event)).data(payload),
                Err(e) => {
                    tracing::warn!(error = %e, "Dropping unserializable event");
                    return None;
                }
            },
            // A slow consumer missed events; tell it so instead of silently resuming
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "SSE consumer lagged behind the event bus");
                SseEvent::default()
                    .event("error")
                    .data(format!(r#"{{"error":"lagged","skipped":{skipped}}}"#))
            }
        };
        Some(Ok(sse))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// POST /shutdown - Graceful shutdown
#[utoipa::path(
    post,
    path = "/api/v1/shutdown",
    tag = "system",
    responses(
        (status = 202, description = "Shutdown initiated"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn shutdown(State(state): State<AppState>) -> impl IntoResponse {
    tokio::spawn(async move {
        // Give the 202 a moment to reach the client before tearing down
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        if let Err(e) = state.downloader.shutdown().await {
            tracing::error!(error = %e, "Error during graceful shutdown");
        }

        std::process::exit(0);
    });

    (
        StatusCode::ACCEPTED,
        Json(json!({"status": "shutdown initiated"})),
    )
}
