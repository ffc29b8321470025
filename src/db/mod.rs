//! Database layer for music-dl
//!
//! Handles SQLite persistence for batch sessions, per-item outcomes, and
//! user settings. The download archive itself is a plain text file (see
//! [`crate::archive`]); the database records the session history around it.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] — Database lifecycle, schema migrations
//! - [`sessions`] — Batch session and item CRUD, history stats
//! - [`settings`] — Persisted user settings

use crate::types::{BatchId, BatchStats, ItemInfo, ItemStatus, SessionInfo};
use sqlx::{FromRow, sqlite::SqlitePool};
use std::path::PathBuf;

mod migrations;
mod sessions;
mod settings;

/// New batch session to be inserted into the database
#[derive(Debug, Clone)]
pub struct NewSession {
    /// Short human-facing reference for log lines and zip names
    pub reference: String,
    /// Per-batch output directory
    pub output_dir: String,
    /// Number of submitted requests
    pub total: i64,
    /// Unix timestamp when the batch was submitted
    pub started_at: i64,
}

/// Batch session record from database
#[derive(Debug, Clone, FromRow)]
pub struct SessionRow {
    /// Unique database ID
    pub id: i64,
    /// Short human-facing reference
    pub reference: String,
    /// Per-batch output directory
    pub output_dir: String,
    /// Packaged zip path, when one was produced
    pub zip_path: Option<String>,
    /// Number of submitted requests
    pub total: i64,
    /// Successful items (written at finalization)
    pub completed: i64,
    /// Skipped items (written at finalization)
    pub skipped: i64,
    /// Failed items (written at finalization)
    pub failed: i64,
    /// Unix timestamp when the batch was submitted
    pub started_at: i64,
    /// Unix timestamp when the last item resolved (NULL while running)
    pub finished_at: Option<i64>,
}

impl From<SessionRow> for SessionInfo {
    fn from(row: SessionRow) -> Self {
        use chrono::{TimeZone, Utc};

        SessionInfo {
            id: BatchId::new(row.id),
            reference: row.reference,
            started_at: Utc
                .timestamp_opt(row.started_at, 0)
                .single()
                .unwrap_or_else(Utc::now),
            finished_at: row
                .finished_at
                .and_then(|ts| Utc.timestamp_opt(ts, 0).single()),
            output_dir: PathBuf::from(row.output_dir),
            zip_path: row.zip_path.map(PathBuf::from),
            stats: BatchStats {
                total: row.total as usize,
                completed: row.completed as usize,
                skipped: row.skipped as usize,
                failed: row.failed as usize,
            },
            running: row.finished_at.is_none(),
        }
    }
}

/// New batch item to be inserted into the database
#[derive(Debug, Clone)]
pub struct NewSessionItem {
    /// Session this item belongs to
    pub session_id: BatchId,
    /// 0-based position in the batch
    pub position: i64,
    /// Raw input string (URL or search query)
    pub input: String,
    /// Title known up front (playlist expansion provides one)
    pub title: Option<String>,
}

/// Batch item record from database
#[derive(Debug, Clone, FromRow)]
pub struct SessionItemRow {
    /// Unique database ID
    pub id: i64,
    /// Session this item belongs to
    pub session_id: i64,
    /// 0-based position in the batch
    pub position: i64,
    /// Raw input string
    pub input: String,
    /// Item state (see [`ItemStatus`])
    pub status: i32,
    /// Resolved title
    pub title: Option<String>,
    /// Archive identifier (successful items only)
    pub identifier: Option<String>,
    /// Skip or failure reason
    pub reason: Option<String>,
}

impl From<SessionItemRow> for ItemInfo {
    fn from(row: SessionItemRow) -> Self {
        ItemInfo {
            position: row.position as usize,
            input: row.input,
            status: ItemStatus::from_i32(row.status),
            title: row.title,
            identifier: row.identifier,
            reason: row.reason,
        }
    }
}

/// Session-level outcome filter for history queries
///
/// A finished session counts as `Complete` when no item failed; a single
/// failed item makes the whole session `Failed` for filtering purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Every resolved item succeeded or was skipped
    Complete,
    /// At least one item failed
    Failed,
}

/// Database handle for music-dl
pub struct Database {
    pool: SqlitePool,
}
