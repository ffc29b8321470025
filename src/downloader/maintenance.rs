//! Maintenance surface — settings, archive, history, live log.

use crate::db::SessionOutcome;
use crate::types::{Event, HistoryStats, SessionInfo, SettingsUpdate, UserSettings};
use crate::Result;

use super::MusicDownloader;

impl MusicDownloader {
    /// Read the persisted user settings
    pub async fn settings(&self) -> Result<UserSettings> {
        self.db.load_settings().await
    }

    /// Apply a partial settings update and return the merged result
    ///
    /// Only the fields present in `update` change; everything else keeps its
    /// stored value. The merged settings apply to batches submitted after
    /// this call, not to batches already running.
    pub async fn update_settings(&self, update: &SettingsUpdate) -> Result<UserSettings> {
        let merged = self.db.load_settings().await?.merged(update);
        self.db.store_settings(&merged).await?;

        tracing::info!(
            quality = %merged.default_quality,
            auto_zip = merged.auto_zip,
            max_history = merged.max_history,
            "Settings updated"
        );

        Ok(merged)
    }

    /// List every identifier in the dedup archive, sorted
    pub async fn archive_identifiers(&self) -> Vec<String> {
        self.archive.entries().await
    }

    /// Number of identifiers currently archived
    pub async fn archive_len(&self) -> usize {
        self.archive.len().await
    }

    /// Clear the dedup archive
    ///
    /// Truncates the archive file and empties the in-memory set, so every
    /// previously downloaded identifier becomes eligible again. Returns the
    /// number of entries removed.
    pub async fn clear_archive(&self) -> Result<usize> {
        let entries_removed = self.archive.clear().await?;

        tracing::info!(entries_removed, "Download archive cleared");
        self.emit_event(Event::ArchiveCleared { entries_removed });
        self.log_line(
            "INFO",
            format!("archive cleared ({entries_removed} entries removed)"),
        );

        Ok(entries_removed)
    }

    /// List finished sessions, newest first, optionally filtered by outcome
    pub async fn history(
        &self,
        outcome: Option<SessionOutcome>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<SessionInfo>> {
        self.db.query_history(outcome, limit, offset).await
    }

    /// Number of finished sessions matching an optional outcome filter
    pub async fn history_count(&self, outcome: Option<SessionOutcome>) -> Result<i64> {
        self.db.count_history(outcome).await
    }

    /// Aggregate download statistics across all recorded sessions
    pub async fn history_stats(&self) -> Result<HistoryStats> {
        self.db.history_stats().await
    }

    /// Delete all finished sessions
    ///
    /// Running batches are left alone so their runners can still finalize.
    /// Returns the number of sessions removed.
    pub async fn clear_history(&self) -> Result<u64> {
        let removed = self.db.clear_finished_sessions().await?;
        tracing::info!(removed, "Session history cleared");
        Ok(removed)
    }

    /// Most recent live log lines, oldest first
    pub fn recent_logs(&self, limit: usize) -> Vec<String> {
        self.log.recent(limit)
    }
}
