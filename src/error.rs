//! Error types for music-dl
//!
//! Domain errors ([`FetchError`], [`BatchError`], [`DatabaseError`]) roll up
//! into the crate-wide [`Error`], which [`ToHttpStatus`] maps onto HTTP
//! statuses and machine-readable codes for the REST layer. Variants carry
//! the context that matters for diagnosis: the input line, the engine name,
//! the batch id.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for music-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Crate-wide error type
#[derive(Debug, Error)]
pub enum Error {
    /// A setting could not be parsed or failed validation
    #[error("configuration error: {message}")]
    Config {
        /// What was wrong with the value
        message: String,
        /// The offending environment variable (e.g., "MUSIC_DL_WORKERS")
        key: Option<String>,
    },

    /// Persistence-layer failure
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// Raw sqlx failure that escaped the persistence layer's own mapping
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Per-item retrieval or conversion failure
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Batch lifecycle error
    #[error("batch error: {0}")]
    Batch(#[from] BatchError),

    /// Dedup archive file operation failed
    #[error("archive error at {path}: {message}")]
    Archive {
        /// What went wrong
        message: String,
        /// The archive file involved
        path: PathBuf,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Resource not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Shutdown in progress - not accepting new batches
    #[error("shutdown in progress: not accepting new batches")]
    ShuttingDown,

    /// JSON (de)serialization failure
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The HTTP server could not bind or serve
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// The required audio encoding tool was not found at startup.
    /// This is the only condition treated as fatal: the coordinator refuses
    /// to start rather than fail every conversion individually.
    #[error("required encoding tool '{tool}' not found in PATH")]
    EncoderMissing {
        /// Name of the missing binary (e.g., "ffmpeg")
        tool: String,
    },

    /// Anything without a better home
    #[error("{0}")]
    Other(String),
}

/// Persistence-layer errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Could not open or connect to the SQLite file
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// A schema migration step failed
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// A query failed mid-operation
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// The requested row does not exist
    #[error("record not found: {0}")]
    NotFound(String),
}

/// Per-item failure taxonomy
///
/// Every variant marks exactly one item Failed (or, for [`FetchError::DuplicateSkip`],
/// Skipped); none of them aborts the batch or triggers coordinator-level retries.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The per-socket timeout elapsed while the engine was transferring data
    #[error("network timeout after {timeout_secs}s fetching '{input}'")]
    NetworkTimeout {
        /// The raw input that was being fetched
        input: String,
        /// The configured per-socket timeout in seconds
        timeout_secs: u64,
    },

    /// The referenced media is gone: removed, private, or region-locked
    #[error("resource unavailable for '{input}': {reason}")]
    UnavailableResource {
        /// The raw input that could not be fetched
        input: String,
        /// Engine-reported reason (e.g., "video unavailable")
        reason: String,
    },

    /// Retrieval succeeded but the audio conversion step failed
    #[error("codec error converting '{input}': {reason}")]
    CodecError {
        /// The raw input whose download could not be converted
        input: String,
        /// Encoder-reported reason
        reason: String,
    },

    /// The item's identifier was found in the archive at record time.
    /// Resolved as a Skipped outcome, not a failure: another worker won
    /// the race for the same identifier mid-batch.
    #[error("identifier '{identifier}' already archived")]
    DuplicateSkip {
        /// The archive identifier that was already present
        identifier: String,
    },

    /// The engine exited non-zero with output matching no known category
    #[error("{engine} failed: {reason}")]
    EngineFailure {
        /// Name of the engine that failed (e.g., "yt-dlp")
        engine: String,
        /// Trailing engine output, for diagnosis
        reason: String,
    },

    /// The engine needed for this input kind is not installed
    #[error("engine '{engine}' is not available")]
    EngineUnavailable {
        /// Name of the missing engine binary
        engine: String,
    },
}

impl FetchError {
    /// Whether this failure resolves the item as Skipped rather than Failed
    pub fn is_duplicate(&self) -> bool {
        matches!(self, FetchError::DuplicateSkip { .. })
    }
}

/// Batch lifecycle errors
#[derive(Debug, Error)]
pub enum BatchError {
    /// Batch not found in memory or database
    #[error("batch {id} not found")]
    NotFound {
        /// The batch ID that was not found
        id: i64,
    },

    /// The submitted text contained no usable request lines
    #[error("no usable input lines (blank lines and #-comments are ignored)")]
    NoInput,

    /// Stop requested for a batch that already resolved every item
    #[error("batch {id} already finished")]
    AlreadyFinished {
        /// The batch ID that already finished
        id: i64,
    },
}

/// Error envelope returned by every failing API endpoint
///
/// ```json
/// {
///   "error": {
///     "code": "batch_not_found",
///     "message": "batch 123 not found",
///     "details": { "batch_id": 123 }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Body of the [`ApiError`] envelope
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Stable machine-readable code (e.g., "no_input", "duplicate_skip")
    pub code: String,

    /// Human-readable description of the failure
    pub message: String,

    /// Structured fields from the originating variant, when it has any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Envelope with the given code and message, no details
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Envelope for unexpected server-side failures
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }
}

/// Maps domain errors onto HTTP statuses and wire codes
pub trait ToHttpStatus {
    /// HTTP status for this error
    fn status_code(&self) -> u16;

    /// Stable machine-readable code for this error
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - Client error (invalid input)
            Error::Config { .. } => 400,

            // 404 Not Found
            Error::NotFound(_) => 404,
            Error::Batch(BatchError::NotFound { .. }) => 404,

            // 409 Conflict - Resource already in desired state
            Error::Batch(BatchError::AlreadyFinished { .. }) => 409,
            Error::Fetch(FetchError::DuplicateSkip { .. }) => 409,

            // 422 Unprocessable Entity - Semantic errors
            Error::Batch(BatchError::NoInput) => 422,
            Error::Fetch(FetchError::CodecError { .. }) => 422,

            // 500 Internal Server Error - Server-side issues
            Error::Database(_) => 500,
            Error::Sqlx(_) => 500,
            Error::Io(_) => 500,
            Error::Archive { .. } => 500,
            Error::ApiServerError(_) => 500,
            Error::Serialization(_) => 500,
            Error::Other(_) => 500,

            // 502 Bad Gateway - upstream media source errors
            Error::Fetch(FetchError::UnavailableResource { .. }) => 502,
            Error::Fetch(FetchError::EngineFailure { .. }) => 502,

            // 503 Service Unavailable - missing external tools
            Error::ShuttingDown => 503,
            Error::EncoderMissing { .. } => 503,
            Error::Fetch(FetchError::EngineUnavailable { .. }) => 503,

            // 504 Gateway Timeout
            Error::Fetch(FetchError::NetworkTimeout { .. }) => 504,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Database(_) => "database_error",
            Error::Sqlx(_) => "database_error",
            Error::Fetch(e) => match e {
                FetchError::NetworkTimeout { .. } => "network_timeout",
                FetchError::UnavailableResource { .. } => "unavailable_resource",
                FetchError::CodecError { .. } => "codec_error",
                FetchError::DuplicateSkip { .. } => "duplicate_skip",
                FetchError::EngineFailure { .. } => "engine_failure",
                FetchError::EngineUnavailable { .. } => "engine_unavailable",
            },
            Error::Batch(e) => match e {
                BatchError::NotFound { .. } => "batch_not_found",
                BatchError::NoInput => "no_input",
                BatchError::AlreadyFinished { .. } => "already_finished",
            },
            Error::Archive { .. } => "archive_error",
            Error::Io(_) => "io_error",
            Error::NotFound(_) => "not_found",
            Error::ShuttingDown => "shutting_down",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::EncoderMissing { .. } => "encoder_missing",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        // Variants with useful fields expose them as structured details
        let details = match &error {
            Error::Batch(BatchError::NotFound { id }) => Some(serde_json::json!({
                "batch_id": id,
            })),
            Error::Batch(BatchError::AlreadyFinished { id }) => Some(serde_json::json!({
                "batch_id": id,
            })),
            Error::Fetch(FetchError::NetworkTimeout {
                input,
                timeout_secs,
            }) => Some(serde_json::json!({
                "input": input,
                "timeout_secs": timeout_secs,
            })),
            Error::Fetch(FetchError::UnavailableResource { input, reason }) => {
                Some(serde_json::json!({
                    "input": input,
                    "reason": reason,
                }))
            }
            Error::Fetch(FetchError::CodecError { input, reason }) => Some(serde_json::json!({
                "input": input,
                "reason": reason,
            })),
            Error::Fetch(FetchError::DuplicateSkip { identifier }) => Some(serde_json::json!({
                "identifier": identifier,
            })),
            Error::Fetch(FetchError::EngineUnavailable { engine }) => Some(serde_json::json!({
                "engine": engine,
            })),
            Error::EncoderMissing { tool } => Some(serde_json::json!({
                "tool": tool,
            })),
            Error::Archive { path, .. } => Some(serde_json::json!({
                "path": path,
            })),
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({
                "key": key,
            })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
