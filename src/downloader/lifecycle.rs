//! Startup and shutdown coordination.

use crate::error::Result;
use crate::types::Event;

use super::MusicDownloader;

impl MusicDownloader {
    /// Gracefully shut down the coordinator
    ///
    /// This method performs a graceful shutdown sequence:
    /// 1. Stops accepting new batches
    /// 2. Signals every running batch to stop dispatching
    /// 3. Waits for running batches to finalize with a timeout (30 seconds)
    /// 4. Emits the shutdown event
    ///
    /// Items already in flight when shutdown starts run to their natural
    /// end inside the timeout window; each runner finalizes its own session
    /// row, so there is no separate persistence step here.
    ///
    /// # Errors
    ///
    /// Currently infallible; the `Result` return leaves room for shutdown
    /// steps that can fail.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        // 1. Stop accepting new batches
        self.worker_state
            .accepting_new
            .store(false, std::sync::atomic::Ordering::SeqCst);
        tracing::info!("Stopped accepting new batches");

        // 2. Signal all running batches to stop dispatching
        self.stop_all_batches().await;
        tracing::info!("Signaled stop to all running batches");

        // 3. Wait for running batches to finalize with timeout
        let shutdown_timeout = std::time::Duration::from_secs(30);
        let wait_result =
            tokio::time::timeout(shutdown_timeout, self.wait_for_active_batches()).await;

        match wait_result {
            Ok(()) => {
                tracing::info!("All batches finalized gracefully");
            }
            Err(_) => {
                tracing::warn!("Timeout waiting for batches to finalize, proceeding with shutdown");
            }
        }

        // 4. Emit shutdown event
        let _ = self.event_tx.send(Event::Shutdown);

        // Database connections close when the last reference is dropped
        tracing::info!("Graceful shutdown complete");
        Ok(())
    }

    /// Signal every running batch to stop dispatching new items
    pub(crate) async fn stop_all_batches(&self) {
        let active = self.worker_state.active_batches.lock().await;
        tracing::debug!(active_count = active.len(), "Stopping all running batches");

        for (id, token) in active.iter() {
            tracing::debug!(batch_id = id.0, "Signaling batch stop");
            token.cancel();
        }
    }

    /// Wait until every batch runner has finalized and deregistered itself
    async fn wait_for_active_batches(&self) {
        loop {
            let active_count = {
                let active = self.worker_state.active_batches.lock().await;
                active.len()
            };

            if active_count == 0 {
                return;
            }

            tracing::debug!(active_count, "Waiting for batches to finalize");
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
    }

    /// Whether the coordinator still accepts new batch submissions
    pub fn is_accepting(&self) -> bool {
        self.worker_state
            .accepting_new
            .load(std::sync::atomic::Ordering::SeqCst)
    }
}
