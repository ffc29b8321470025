//! API key authentication middleware
//!
//! Gates every route behind a shared-secret `X-Api-Key` header when
//! `ApiConfig::api_key` is configured. Without a configured key the
//! middleware passes every request through, which is the default for a
//! localhost-bound coordinator.

use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Header carrying the client's API key
const API_KEY_HEADER: &str = "x-api-key";

/// Middleware gating requests on a shared API key
///
/// The expected key arrives through router state; a `None` state admits
/// every request. Rejections are `401` with the standard error envelope.
pub async fn require_api_key(
    State(expected): State<Option<String>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = expected else {
        return next.run(request).await;
    };

    match presented_key(&request) {
        Some(presented) if keys_match(presented, &expected) => next.run(request).await,
        Some(_) => reject("Invalid API key"),
        None => reject("Missing X-Api-Key header"),
    }
}

/// The key offered by the client, if the header is present and readable
fn presented_key(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
}

/// Compare keys without leaking the mismatch position through timing:
/// every byte is visited even after the first difference
fn keys_match(presented: &str, expected: &str) -> bool {
    let (a, b) = (presented.as_bytes(), expected.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// 401 with the API error envelope
fn reject(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "error": {
                "code": "unauthorized",
                "message": message
            }
        })),
    )
        .into_response()
}
