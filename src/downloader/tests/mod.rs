//! Coordinator tests driving full batches through a scripted in-process
//! engine, so no external binaries or network access are required.

mod concurrency;

pub(crate) use crate::downloader::test_helpers::{
    create_test_downloader, create_test_downloader_with_workers,
    create_test_downloader_without_engines, wait_for_batch, ScriptedOutcome,
};
pub(crate) use crate::engine::TrackRef;
pub(crate) use crate::error::{BatchError, Error};
pub(crate) use crate::types::{BatchId, BatchOptions, Event, ItemStatus, SettingsUpdate};

use std::time::Duration;

/// Receive events until the batch's completion event arrives (2s budget)
pub(crate) async fn collect_batch_events(
    events: &mut tokio::sync::broadcast::Receiver<Event>,
    id: BatchId,
) -> Vec<Event> {
    let mut seen = Vec::new();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        let event = tokio::time::timeout(remaining, events.recv())
            .await
            .expect("timed out waiting for batch completion event")
            .expect("event channel closed");
        let done = matches!(&event, Event::BatchCompleted { id: done_id, .. } if *done_id == id);
        seen.push(event);
        if done {
            return seen;
        }
    }
}
