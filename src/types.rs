//! Core types for music-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use utoipa::ToSchema;

/// Unique identifier for a batch session
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct BatchId(pub i64);

impl BatchId {
    /// Create a new BatchId
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the inner i64 value
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl From<i64> for BatchId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<BatchId> for i64 {
    fn from(id: BatchId) -> Self {
        id.0
    }
}

impl PartialEq<i64> for BatchId {
    fn eq(&self, other: &i64) -> bool {
        self.0 == *other
    }
}

impl PartialEq<BatchId> for i64 {
    fn eq(&self, other: &BatchId) -> bool {
        *self == other.0
    }
}

impl std::fmt::Display for BatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for BatchId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

// Implement sqlx Type, Encode, and Decode for database operations
impl sqlx::Type<sqlx::Sqlite> for BatchId {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <i64 as sqlx::Type<sqlx::Sqlite>>::type_info()
    }

    fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
        <i64 as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for BatchId {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        sqlx::Encode::<sqlx::Sqlite>::encode_by_ref(&self.0, buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for BatchId {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let id = <i64 as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        Ok(Self(id))
    }
}

/// Per-item lifecycle state
///
/// State machine: `Queued → {Skipped | Dispatched}`, `Dispatched → {Success | Failed}`.
/// Skipped, Success and Failed are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    /// Parsed and waiting for the pre-dispatch archive check
    Queued,
    /// Handed to a worker, retrieval in progress
    Dispatched,
    /// Retrieved and converted, identifier recorded in the archive
    Success,
    /// Not dispatched (or not recorded) because its identifier was already archived
    Skipped,
    /// Retrieval or conversion failed; reason captured
    Failed,
}

impl ItemStatus {
    /// Convert integer status code to ItemStatus enum
    pub fn from_i32(status: i32) -> Self {
        match status {
            0 => ItemStatus::Queued,
            1 => ItemStatus::Dispatched,
            2 => ItemStatus::Success,
            3 => ItemStatus::Skipped,
            4 => ItemStatus::Failed,
            _ => ItemStatus::Failed, // Default to Failed for unknown status
        }
    }

    /// Convert ItemStatus enum to integer status code
    pub fn to_i32(&self) -> i32 {
        match self {
            ItemStatus::Queued => 0,
            ItemStatus::Dispatched => 1,
            ItemStatus::Success => 2,
            ItemStatus::Skipped => 3,
            ItemStatus::Failed => 4,
        }
    }

    /// Whether this state is terminal (no further transitions)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ItemStatus::Success | ItemStatus::Skipped | ItemStatus::Failed
        )
    }
}

/// Classification of a raw input line
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    /// Direct URL to a single piece of media
    MediaUrl,
    /// URL referencing a playlist or set (expanded before dispatch)
    PlaylistUrl,
    /// Streaming-service URL (routed to the streaming engine)
    StreamingUrl,
    /// Free-text search query (resolved by the media engine at fetch time)
    SearchQuery,
}

/// One parsed download request within a batch
///
/// Immutable once enqueued; `position` is the 0-based index in the submitted
/// batch and is used for ordered progress reporting.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DownloadRequest {
    /// 0-based position in the submitted batch
    pub position: usize,

    /// Raw input string (URL or free-text query)
    pub input: String,

    /// Derived classification
    pub kind: RequestKind,

    /// Display title, if known before fetch (from playlist expansion)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Target audio bitrate for the conversion step
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum Quality {
    /// 128 kbps
    #[serde(rename = "128")]
    K128,
    /// 192 kbps
    #[serde(rename = "192")]
    K192,
    /// 256 kbps
    #[serde(rename = "256")]
    K256,
    /// 320 kbps (default)
    #[default]
    #[serde(rename = "320")]
    K320,
}

impl Quality {
    /// Bitrate in kbps
    pub fn kbps(&self) -> u32 {
        match self {
            Quality::K128 => 128,
            Quality::K192 => 192,
            Quality::K256 => 256,
            Quality::K320 => 320,
        }
    }
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kbps())
    }
}

impl std::str::FromStr for Quality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "128" => Ok(Quality::K128),
            "192" => Ok(Quality::K192),
            "256" => Ok(Quality::K256),
            "320" => Ok(Quality::K320),
            other => Err(format!(
                "invalid quality '{}': expected one of 128, 192, 256, 320",
                other
            )),
        }
    }
}

/// Aggregated counts for one batch
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BatchStats {
    /// Number of submitted requests
    pub total: usize,

    /// Requests that downloaded and converted successfully
    pub completed: usize,

    /// Requests skipped because their identifier was already archived
    pub skipped: usize,

    /// Requests that failed with a captured reason
    pub failed: usize,
}

impl BatchStats {
    /// Number of requests with a terminal outcome so far
    pub fn resolved(&self) -> usize {
        self.completed + self.skipped + self.failed
    }
}

/// Per-batch submission options
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct BatchOptions {
    /// Target bitrate (None = use the configured default)
    #[serde(default)]
    pub quality: Option<Quality>,

    /// Embed thumbnails and metadata tags (None = use the configured default)
    #[serde(default)]
    pub embed_thumbnail: Option<bool>,
}

/// Event emitted during batch processing
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Batch accepted and its worker fan-out started
    BatchStarted {
        /// Batch ID
        id: BatchId,
        /// Short human-facing session reference
        reference: String,
        /// Number of requests after playlist expansion
        total: usize,
    },

    /// Item handed to a worker
    ItemDispatched {
        /// Batch ID
        id: BatchId,
        /// Item position within the batch
        position: usize,
        /// Raw input being fetched
        input: String,
    },

    /// Item retrieved, converted and archived
    ItemCompleted {
        /// Batch ID
        id: BatchId,
        /// Item position within the batch
        position: usize,
        /// Resolved track title
        title: String,
        /// Archive identifier recorded for the item
        identifier: String,
    },

    /// Item skipped without work (identifier already archived)
    ItemSkipped {
        /// Batch ID
        id: BatchId,
        /// Item position within the batch
        position: usize,
        /// Why the item was skipped
        reason: String,
    },

    /// Item failed; other items are unaffected
    ItemFailed {
        /// Batch ID
        id: BatchId,
        /// Item position within the batch
        position: usize,
        /// Categorized failure reason
        error: String,
    },

    /// Stop requested: no further dispatches for this batch
    BatchStopped {
        /// Batch ID
        id: BatchId,
    },

    /// All items terminal; final tally available
    BatchCompleted {
        /// Batch ID
        id: BatchId,
        /// Final counts
        stats: BatchStats,
        /// Path of the packaged zip, when one was produced
        #[serde(skip_serializing_if = "Option::is_none")]
        zip_path: Option<PathBuf>,
    },

    /// Dedup archive was cleared by explicit user action
    ArchiveCleared {
        /// Number of identifiers removed
        entries_removed: usize,
    },

    /// A formatted line was appended to the live log buffer
    LogLine {
        /// The formatted log line
        line: String,
    },

    /// Graceful shutdown initiated
    Shutdown,
}

/// Per-item view for API consumers
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ItemInfo {
    /// 0-based position in the batch
    pub position: usize,

    /// Raw input string
    pub input: String,

    /// Current state
    pub status: ItemStatus,

    /// Resolved title (after fetch or playlist expansion)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Archive identifier (Success only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,

    /// Reason string (Failed and Skipped)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Session summary for API consumers and history listings
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionInfo {
    /// Batch ID
    pub id: BatchId,

    /// Short human-facing reference
    pub reference: String,

    /// When the batch was submitted
    pub started_at: DateTime<Utc>,

    /// When the last item resolved (None while running)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,

    /// Per-batch output directory
    pub output_dir: PathBuf,

    /// Packaged zip path, when produced
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip_path: Option<PathBuf>,

    /// Aggregated counts
    pub stats: BatchStats,

    /// Whether items are still unresolved
    pub running: bool,
}

/// Aggregate statistics across all persisted sessions
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct HistoryStats {
    /// Total successful downloads across all sessions
    pub total_downloads: u64,

    /// Total failed items across all sessions
    pub total_failed: u64,

    /// Total skipped items across all sessions
    pub total_skipped: u64,

    /// Number of recorded sessions
    pub total_sessions: u64,

    /// Success percentage over completed + failed, formatted as e.g. "93.8%"
    pub success_rate: String,
}

/// Runtime-adjustable user settings, persisted in the database
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserSettings {
    /// Default target bitrate for batches that don't specify one
    #[serde(default)]
    pub default_quality: Quality,

    /// Embed thumbnails and metadata tags by default
    #[serde(default = "default_true")]
    pub embed_thumbnail: bool,

    /// Package the batch directory into a zip when any item succeeds
    #[serde(default = "default_true")]
    pub auto_zip: bool,

    /// Number of most recent sessions to keep in history
    #[serde(default = "default_max_history")]
    pub max_history: usize,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            default_quality: Quality::default(),
            embed_thumbnail: true,
            auto_zip: true,
            max_history: default_max_history(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_history() -> usize {
    50
}

/// Partial settings update; absent fields keep their current value
#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
pub struct SettingsUpdate {
    /// New default bitrate
    pub default_quality: Option<Quality>,

    /// New thumbnail embedding default
    pub embed_thumbnail: Option<bool>,

    /// New zip packaging default
    pub auto_zip: Option<bool>,

    /// New history retention count
    pub max_history: Option<usize>,
}

impl UserSettings {
    /// Apply a partial update on top of the current settings
    pub fn merged(&self, update: &SettingsUpdate) -> Self {
        Self {
            default_quality: update.default_quality.unwrap_or(self.default_quality),
            embed_thumbnail: update.embed_thumbnail.unwrap_or(self.embed_thumbnail),
            auto_zip: update.auto_zip.unwrap_or(self.auto_zip),
            max_history: update.max_history.unwrap_or(self.max_history),
        }
    }
}

/// Availability of the external tools the coordinator delegates to
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Capabilities {
    /// General-purpose media engine (required)
    pub media_engine: EngineInfo,

    /// Streaming-service engine (optional; streaming URLs fail per-item when absent)
    pub streaming_engine: EngineInfo,

    /// Whether the required encoding tool was found at startup
    pub encoder_present: bool,
}

/// Availability information for one download engine
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EngineInfo {
    /// Engine implementation name
    pub name: String,

    /// Whether the engine binary was found
    pub available: bool,

    /// Reported version string, if probed successfully
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}
