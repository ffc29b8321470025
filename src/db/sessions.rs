//! Batch session and item CRUD, history statistics.

use crate::error::BatchError;
use crate::types::{BatchId, BatchStats, HistoryStats, ItemInfo, ItemStatus, SessionInfo};
use crate::{Error, Result};
use std::path::Path;

use super::{Database, NewSession, NewSessionItem, SessionItemRow, SessionOutcome, SessionRow};

const SESSION_COLUMNS: &str = "id, reference, output_dir, zip_path, total, \
                               completed, skipped, failed, started_at, finished_at";

impl Database {
    /// Insert a new batch session
    ///
    /// Called when a batch is submitted, before any item is dispatched. The
    /// returned ID is the batch ID used everywhere else.
    pub async fn insert_session(&self, session: &NewSession) -> Result<BatchId> {
        let result = sqlx::query(
            r#"
            INSERT INTO sessions (reference, output_dir, total, started_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&session.reference)
        .bind(&session.output_dir)
        .bind(session.total)
        .bind(session.started_at)
        .execute(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        Ok(BatchId::new(result.last_insert_rowid()))
    }

    /// Update a session's item count after playlist expansion
    pub async fn update_session_total(&self, session_id: BatchId, total: i64) -> Result<()> {
        sqlx::query("UPDATE sessions SET total = ? WHERE id = ?")
            .bind(total)
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Sqlx)?;

        Ok(())
    }

    /// Insert all items of a batch in one statement per chunk
    pub async fn insert_session_items(&self, items: &[NewSessionItem]) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }

        // SQLite default SQLITE_MAX_VARIABLE_NUMBER is 999.
        // Each item uses 5 bind variables, so max 199 items per chunk.
        const MAX_ITEMS_PER_CHUNK: usize = 199;

        for chunk in items.chunks(MAX_ITEMS_PER_CHUNK) {
            let mut query_builder = sqlx::QueryBuilder::new(
                "INSERT INTO session_items (session_id, position, input, title, status) ",
            );

            query_builder.push_values(chunk, |mut b, item| {
                b.push_bind(item.session_id)
                    .push_bind(item.position)
                    .push_bind(&item.input)
                    .push_bind(&item.title)
                    .push_bind(ItemStatus::Queued.to_i32());
            });

            let query = query_builder.build();
            query.execute(&self.pool).await.map_err(Error::Sqlx)?;
        }

        Ok(())
    }

    /// Mark an item as handed to a worker
    pub async fn mark_item_dispatched(&self, session_id: BatchId, position: i64) -> Result<()> {
        sqlx::query("UPDATE session_items SET status = ? WHERE session_id = ? AND position = ?")
            .bind(ItemStatus::Dispatched.to_i32())
            .bind(session_id)
            .bind(position)
            .execute(&self.pool)
            .await
            .map_err(Error::Sqlx)?;

        Ok(())
    }

    /// Mark an item as successfully downloaded and archived
    pub async fn mark_item_success(
        &self,
        session_id: BatchId,
        position: i64,
        title: Option<&str>,
        identifier: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE session_items
            SET status = ?, title = COALESCE(?, title), identifier = ?
            WHERE session_id = ? AND position = ?
            "#,
        )
        .bind(ItemStatus::Success.to_i32())
        .bind(title)
        .bind(identifier)
        .bind(session_id)
        .bind(position)
        .execute(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        Ok(())
    }

    /// Mark an item as skipped with a reason
    pub async fn mark_item_skipped(
        &self,
        session_id: BatchId,
        position: i64,
        reason: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE session_items
            SET status = ?, reason = ?
            WHERE session_id = ? AND position = ?
            "#,
        )
        .bind(ItemStatus::Skipped.to_i32())
        .bind(reason)
        .bind(session_id)
        .bind(position)
        .execute(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        Ok(())
    }

    /// Mark an item as failed with a captured reason
    pub async fn mark_item_failed(
        &self,
        session_id: BatchId,
        position: i64,
        reason: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE session_items
            SET status = ?, reason = ?
            WHERE session_id = ? AND position = ?
            "#,
        )
        .bind(ItemStatus::Failed.to_i32())
        .bind(reason)
        .bind(session_id)
        .bind(position)
        .execute(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        Ok(())
    }

    /// Write the final aggregate onto a session once every item is terminal
    pub async fn finalize_session(
        &self,
        session_id: BatchId,
        stats: &BatchStats,
        zip_path: Option<&Path>,
        finished_at: i64,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET completed = ?, skipped = ?, failed = ?, zip_path = ?, finished_at = ?
            WHERE id = ?
            "#,
        )
        .bind(stats.completed as i64)
        .bind(stats.skipped as i64)
        .bind(stats.failed as i64)
        .bind(zip_path.and_then(|p| p.to_str().map(String::from)))
        .bind(finished_at)
        .bind(session_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        if result.rows_affected() == 0 {
            return Err(Error::Batch(BatchError::NotFound {
                id: session_id.get(),
            }));
        }

        Ok(())
    }

    /// Get a single session by ID
    ///
    /// For a running session the stats are derived from its items, so the
    /// caller sees terminal counts as they accumulate; finalized sessions
    /// read the denormalized columns.
    pub async fn get_session(&self, session_id: BatchId) -> Result<Option<SessionInfo>> {
        let row = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?"
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut info = SessionInfo::from(row);
        if info.running {
            let (completed, skipped, failed) = self.item_counts(session_id).await?;
            info.stats.completed = completed as usize;
            info.stats.skipped = skipped as usize;
            info.stats.failed = failed as usize;
        }

        Ok(Some(info))
    }

    /// Count terminal items of a session grouped into (completed, skipped, failed)
    async fn item_counts(&self, session_id: BatchId) -> Result<(i64, i64, i64)> {
        let row: (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(CASE WHEN status = ? THEN 1 END),
                COUNT(CASE WHEN status = ? THEN 1 END),
                COUNT(CASE WHEN status = ? THEN 1 END)
            FROM session_items
            WHERE session_id = ?
            "#,
        )
        .bind(ItemStatus::Success.to_i32())
        .bind(ItemStatus::Skipped.to_i32())
        .bind(ItemStatus::Failed.to_i32())
        .bind(session_id)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        Ok(row)
    }

    /// Get all items of a session in submission order
    pub async fn get_session_items(&self, session_id: BatchId) -> Result<Vec<ItemInfo>> {
        let rows = sqlx::query_as::<_, SessionItemRow>(
            r#"
            SELECT id, session_id, position, input, status, title, identifier, reason
            FROM session_items
            WHERE session_id = ?
            ORDER BY position ASC
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        Ok(rows.into_iter().map(ItemInfo::from).collect())
    }

    /// Query sessions with pagination, most recent first
    pub async fn list_sessions(&self, limit: usize, offset: usize) -> Result<Vec<SessionInfo>> {
        let rows = sqlx::query_as::<_, SessionRow>(&format!(
            r#"
            SELECT {SESSION_COLUMNS} FROM sessions
            ORDER BY started_at DESC, id DESC
            LIMIT ? OFFSET ?
            "#
        ))
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        Ok(rows.into_iter().map(SessionInfo::from).collect())
    }

    /// Count all sessions
    ///
    /// Useful for pagination - returns total count of recorded sessions.
    pub async fn count_sessions(&self) -> Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM sessions")
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Sqlx)
    }

    /// Query finished sessions with pagination and an optional outcome filter
    ///
    /// Running sessions are excluded; they are visible through the batch
    /// listing instead. `Complete` keeps sessions where nothing failed,
    /// `Failed` keeps sessions with at least one failure.
    pub async fn query_history(
        &self,
        outcome: Option<SessionOutcome>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<SessionInfo>> {
        let rows = sqlx::query_as::<_, SessionRow>(&format!(
            r#"
            SELECT {SESSION_COLUMNS} FROM sessions
            WHERE finished_at IS NOT NULL {}
            ORDER BY started_at DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
            outcome_clause(outcome)
        ))
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        Ok(rows.into_iter().map(SessionInfo::from).collect())
    }

    /// Count finished sessions matching an optional outcome filter
    pub async fn count_history(&self, outcome: Option<SessionOutcome>) -> Result<i64> {
        sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM sessions WHERE finished_at IS NOT NULL {}",
            outcome_clause(outcome)
        ))
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Sqlx)
    }

    /// Delete all sessions older than the most recent `keep`
    ///
    /// Items are removed through the cascade. Returns the number of sessions
    /// deleted.
    pub async fn delete_sessions_beyond(&self, keep: usize) -> Result<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM sessions
            WHERE id NOT IN (
                SELECT id FROM sessions
                ORDER BY started_at DESC, id DESC
                LIMIT ?
            )
            "#,
        )
        .bind(keep as i64)
        .execute(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        Ok(result.rows_affected())
    }

    /// Delete every finished session, leaving running ones untouched
    ///
    /// Item rows go with their session via ON DELETE CASCADE.
    pub async fn clear_finished_sessions(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE finished_at IS NOT NULL")
            .execute(&self.pool)
            .await
            .map_err(Error::Sqlx)?;

        Ok(result.rows_affected())
    }

    /// Aggregate statistics over all retained sessions
    ///
    /// The success rate is computed over resolved items only; skipped items
    /// count as neither success nor failure.
    pub async fn history_stats(&self) -> Result<HistoryStats> {
        let (completed, skipped, failed): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(CASE WHEN status = ? THEN 1 END),
                COUNT(CASE WHEN status = ? THEN 1 END),
                COUNT(CASE WHEN status = ? THEN 1 END)
            FROM session_items
            "#,
        )
        .bind(ItemStatus::Success.to_i32())
        .bind(ItemStatus::Skipped.to_i32())
        .bind(ItemStatus::Failed.to_i32())
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Sqlx)?;

        let total_sessions = self.count_sessions().await?;

        let resolved = (completed + failed).max(1);
        let success_rate = format!("{:.1}%", completed as f64 / resolved as f64 * 100.0);

        Ok(HistoryStats {
            total_downloads: completed as u64,
            total_failed: failed as u64,
            total_skipped: skipped as u64,
            total_sessions: total_sessions as u64,
            success_rate,
        })
    }
}

/// Extra WHERE fragment for a session outcome filter (empty when unfiltered)
fn outcome_clause(outcome: Option<SessionOutcome>) -> &'static str {
    match outcome {
        Some(SessionOutcome::Complete) => "AND failed = 0",
        Some(SessionOutcome::Failed) => "AND failed > 0",
        None => "",
    }
}
