//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`batches`] — Batch submission, inspection, and stop control
//! - [`archive`] — Dedup archive listing and clearing
//! - [`history`] — Persisted session history
//! - [`settings`] — Runtime-adjustable user settings
//! - [`system`] — Health, capabilities, events, logs, OpenAPI, shutdown

use serde::{Deserialize, Serialize};

mod archive;
mod batches;
mod history;
mod settings;
mod system;

// Re-export all handlers so `routes::function_name` continues to work
pub use archive::*;
pub use batches::*;
pub use history::*;
pub use settings::*;
pub use system::*;

// ============================================================================
// Query/Request Types (shared across handlers)
// ============================================================================

/// Request body for POST /batches
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct SubmitBatchRequest {
    /// Raw multi-line input: one URL or search query per line.
    /// Blank lines and lines starting with '#' are ignored.
    pub input: String,

    /// Per-batch overrides for quality and packaging
    #[serde(flatten)]
    pub options: crate::types::BatchOptions,
}

/// Query parameters for paginated listings (GET /batches)
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct PageQuery {
    /// Maximum number of items to return (default: 50)
    pub limit: Option<i64>,
    /// Number of items to skip (default: 0)
    pub offset: Option<i64>,
}

/// Query parameters for GET /history
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct HistoryQuery {
    /// Maximum number of sessions to return (default: 50)
    pub limit: Option<i64>,
    /// Number of sessions to skip (default: 0)
    pub offset: Option<i64>,
    /// Filter by session outcome (complete/failed)
    pub outcome: Option<String>,
}

/// Query parameters for GET /logs
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct LogsQuery {
    /// Maximum number of most-recent lines to return (default: all buffered)
    pub limit: Option<usize>,
}
