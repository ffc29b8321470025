//! REST API server module
//!
//! Provides an OpenAPI 3.1 compliant REST API for submitting download
//! batches, monitoring progress, and managing the archive and settings.

use crate::{Config, MusicDownloader, Result};
use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{delete, get, post, put},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod auth;
pub mod error_response;
pub mod openapi;
pub mod rate_limit;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Assemble the REST router: every endpoint plus the optional
/// Swagger UI, auth, rate-limit, and CORS layers.
///
/// # Routes
///
/// ## Batches
/// - `POST /batches` - Submit a new batch of download requests
/// - `GET /batches` - List batches (running first, then newest finished)
/// - `GET /batches/:id` - Get a single batch session snapshot
/// - `GET /batches/:id/items` - Get per-item states in submission order
/// - `POST /batches/:id/stop` - Stop a running batch (in-flight items finish)
///
/// ## Archive
/// - `GET /archive` - List archived identifiers
/// - `DELETE /archive` - Clear the dedup archive
///
/// ## History
/// - `GET /history` - Get session history (with pagination)
/// - `GET /history/stats` - Aggregate statistics across all sessions
/// - `DELETE /history` - Clear finished sessions
///
/// ## Settings
/// - `GET /settings` - Get current user settings
/// - `PUT /settings` - Apply a partial settings update
///
/// ## System
/// - `GET /health` - Health check
/// - `GET /capabilities` - Engine and encoder availability
/// - `GET /logs` - Most recent live log lines
/// - `GET /openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive Swagger UI documentation (if enabled)
/// - `GET /events` - Server-sent events stream
/// - `POST /shutdown` - Graceful shutdown
pub fn create_router(downloader: Arc<MusicDownloader>, config: Arc<Config>) -> Router {
    let state = AppState::new(downloader, config.clone());

    let mut router = Router::new()
        // Batches
        .route("/batches", post(routes::submit_batch))
        .route("/batches", get(routes::list_batches))
        .route("/batches/:id", get(routes::get_batch))
        .route("/batches/:id/items", get(routes::get_batch_items))
        .route("/batches/:id/stop", post(routes::stop_batch))
        // Archive
        .route("/archive", get(routes::get_archive))
        .route("/archive", delete(routes::clear_archive))
        // History
        .route("/history", get(routes::get_history))
        .route("/history", delete(routes::clear_history))
        .route("/history/stats", get(routes::history_stats))
        // Settings
        .route("/settings", get(routes::get_settings))
        .route("/settings", put(routes::update_settings))
        // System
        .route("/health", get(routes::health_check))
        .route("/capabilities", get(routes::get_capabilities))
        .route("/logs", get(routes::get_logs))
        .route("/openapi.json", get(routes::openapi_spec))
        .route("/events", get(routes::event_stream))
        .route("/shutdown", post(routes::shutdown));

    // Swagger UI is merged before state is applied; it points at the spec
    // route registered above rather than serving its own copy
    if config.server.api.swagger_ui {
        router = router
            .merge(SwaggerUi::new("/swagger-ui").url("/api/v1/openapi.json", ApiDoc::openapi()));
    }

    let mut router = router.with_state(state);

    // Layer order matters: axum runs the last-applied layer first, and the
    // rate limiter must see a request before auth does. Auth is therefore
    // layered first (innermost), rate limiting second.
    if let Some(key) = config.server.api.api_key.clone() {
        router = router.layer(middleware::from_fn_with_state(
            Some(key),
            auth::require_api_key,
        ));
    }

    if config.server.api.rate_limit.enabled {
        let limiter = Arc::new(rate_limit::RateLimiter::new(
            config.server.api.rate_limit.clone(),
        ));
        router = router.layer(middleware::from_fn_with_state(
            limiter,
            rate_limit::rate_limit_middleware,
        ));
    }

    if config.server.api.cors_enabled {
        router = router.layer(build_cors_layer(&config.server.api.cors_origins));
    }

    router
}

/// CORS layer for the configured origins
///
/// `"*"` anywhere in the list (or an empty list) opens the API to any
/// origin; otherwise only the listed origins are admitted. Methods and
/// headers are unrestricted either way.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

/// Bind the configured address and serve the REST API.
///
/// Blocks until the server stops. Connections are served with
/// `ConnectInfo<SocketAddr>` attached so the rate limiter can key
/// buckets on the peer address.
///
/// ```no_run
/// use music_dl::{Config, MusicDownloader};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::default());
/// let downloader = Arc::new(MusicDownloader::new((*config).clone()).await?);
/// music_dl::api::start_api_server(downloader, config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(
    downloader: Arc<MusicDownloader>,
    config: Arc<Config>,
) -> Result<()> {
    let bind_address = config.server.api.bind_address;
    let app = create_router(downloader, config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;
    tracing::info!(address = %bind_address, "API server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
