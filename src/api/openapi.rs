//! OpenAPI documentation and schema generation
//!
//! This module defines the OpenAPI specification for the music-dl REST API
//! using utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the music-dl REST API
///
/// This struct is used to generate the OpenAPI 3.1 specification that describes
/// all available endpoints, request/response types, and API behavior.
///
/// The spec can be accessed via:
/// - `/api/v1/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "music-dl REST API",
        version = "0.4.0",
        description = "OpenAPI 3.1 compliant REST API for submitting music download batches, monitoring progress, and managing the dedup archive",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:7860/api/v1", description = "Local development server")
    ),
    paths(
        // Batches
        crate::api::routes::submit_batch,
        crate::api::routes::list_batches,
        crate::api::routes::get_batch,
        crate::api::routes::get_batch_items,
        crate::api::routes::stop_batch,

        // Archive
        crate::api::routes::get_archive,
        crate::api::routes::clear_archive,

        // History
        crate::api::routes::get_history,
        crate::api::routes::history_stats,
        crate::api::routes::clear_history,

        // Settings
        crate::api::routes::get_settings,
        crate::api::routes::update_settings,

        // System
        crate::api::routes::health_check,
        crate::api::routes::get_capabilities,
        crate::api::routes::get_logs,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
        crate::api::routes::shutdown,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::BatchId,
        crate::types::ItemStatus,
        crate::types::RequestKind,
        crate::types::DownloadRequest,
        crate::types::Quality,
        crate::types::BatchStats,
        crate::types::BatchOptions,
        crate::types::Event,
        crate::types::ItemInfo,
        crate::types::SessionInfo,
        crate::types::HistoryStats,
        crate::types::UserSettings,
        crate::types::SettingsUpdate,
        crate::types::Capabilities,
        crate::types::EngineInfo,

        // Config types from config.rs
        crate::config::Config,
        crate::config::BatchConfig,
        crate::config::EngineConfig,
        crate::config::ToolsConfig,
        crate::config::PersistenceConfig,
        crate::config::ServerIntegrationConfig,
        crate::config::ApiConfig,
        crate::config::RateLimitConfig,

        // API request/response types from routes
        crate::api::routes::SubmitBatchRequest,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "batches", description = "Batch management - Submit download batches, inspect items, request stops"),
        (name = "archive", description = "Dedup archive - List and clear the set of already-downloaded identifiers"),
        (name = "history", description = "Session history - Past batches with their aggregate outcomes"),
        (name = "settings", description = "Settings - Runtime-adjustable defaults for quality and packaging"),
        (name = "system", description = "System endpoints - Health checks, capabilities, logs, events, shutdown"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Registers the `X-Api-Key` header scheme so guarded endpoints can
/// reference it via `security(("api_key" = []))`
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};

        if let Some(components) = &mut openapi.components {
            components.add_security_scheme(
                "api_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-Api-Key"))),
            );
        }
    }
}
