//! Batch control — stop, inspect, list.

use crate::error::{BatchError, Error, Result};
use crate::types::{BatchId, Event, ItemInfo, SessionInfo};

use super::MusicDownloader;

impl MusicDownloader {
    /// Stop a running batch
    ///
    /// Stopping prevents further dispatches: items whose download is already
    /// in flight run to their natural end, while items still queued resolve
    /// as Failed with a "batch stopped" reason. There is no mid-download
    /// interruption.
    ///
    /// Idempotent for a batch that is still running. Stopping a batch that
    /// already resolved every item is an error.
    ///
    /// # Arguments
    ///
    /// * `id` - The batch ID to stop
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use music_dl::*;
    /// # async fn example(downloader: MusicDownloader, id: BatchId) -> Result<()> {
    /// downloader.stop_batch(id).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn stop_batch(&self, id: BatchId) -> Result<()> {
        let active = self.worker_state.active_batches.lock().await;
        if let Some(cancel_token) = active.get(&id) {
            cancel_token.cancel();
            drop(active); // Release lock before emitting

            tracing::info!(batch_id = id.0, "Stop requested for batch");
            self.emit_event(Event::BatchStopped { id });
            self.log_line("STOP", format!("batch {}: stop requested", id.0));
            return Ok(());
        }
        drop(active);

        // Not in the active map: either finished or never existed
        match self.db.get_session(id).await? {
            Some(_) => Err(Error::Batch(BatchError::AlreadyFinished { id: id.get() })),
            None => Err(Error::Batch(BatchError::NotFound { id: id.get() })),
        }
    }

    /// Fetch one batch session
    ///
    /// For a running batch the stats are derived live from its item rows;
    /// finished batches return the persisted final tally.
    pub async fn get_batch(&self, id: BatchId) -> Result<SessionInfo> {
        self.db
            .get_session(id)
            .await?
            .ok_or_else(|| Error::Batch(BatchError::NotFound { id: id.get() }))
    }

    /// Fetch the items of a batch in submission order
    pub async fn get_batch_items(&self, id: BatchId) -> Result<Vec<ItemInfo>> {
        // Distinguish "unknown batch" from "batch with no items yet"
        if self.db.get_session(id).await?.is_none() {
            return Err(Error::Batch(BatchError::NotFound { id: id.get() }));
        }
        self.db.get_session_items(id).await
    }

    /// List batch sessions, running batches first, then newest first
    pub async fn list_batches(&self, limit: usize, offset: usize) -> Result<Vec<SessionInfo>> {
        let sessions = self.db.list_sessions(limit, offset).await?;

        // Stable partition keeps the started_at ordering within each group
        let (running, finished): (Vec<_>, Vec<_>) =
            sessions.into_iter().partition(|session| session.running);
        let mut ordered = running;
        ordered.extend(finished);

        Ok(ordered)
    }
}
