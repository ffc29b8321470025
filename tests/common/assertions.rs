//! Custom test assertions and event-wait helpers for E2E tests

use music_dl::{BatchId, BatchStats, Event, MusicDownloader, SessionInfo};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::broadcast;

/// Result of waiting for a batch to finish
#[derive(Debug)]
pub enum WaitResult {
    /// Batch reached its terminal event, with the final tally
    Finished {
        /// Final per-batch counts
        stats: BatchStats,
        /// Packaged zip path, when one was produced
        zip_path: Option<PathBuf>,
    },
    /// The deadline passed first
    Timeout,
    /// The event bus dropped before the terminal event arrived
    ChannelClosed,
}

/// Wait for a batch's terminal event on an already-open subscription
///
/// Subscribe *before* submitting the batch; a receiver only sees events sent
/// after it was created, and stub-backed batches can finish in milliseconds.
pub async fn wait_for_completion(
    events: &mut broadcast::Receiver<Event>,
    id: BatchId,
    timeout: Duration,
) -> WaitResult {
    let wait = async {
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(_) => return WaitResult::ChannelClosed,
            };
            if let Event::BatchCompleted {
                id: done,
                stats,
                zip_path,
            } = event
                && done == id
            {
                return WaitResult::Finished { stats, zip_path };
            }
        }
    };

    tokio::time::timeout(timeout, wait)
        .await
        .unwrap_or(WaitResult::Timeout)
}

/// Poll the batch until it is no longer running, panicking on timeout
///
/// Unlike [`wait_for_completion`] this cannot miss a fast batch, at the cost
/// of not observing the event itself.
pub async fn wait_until_finished(
    downloader: &MusicDownloader,
    id: BatchId,
    timeout: Duration,
) -> SessionInfo {
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        let session = downloader
            .get_batch(id)
            .await
            .expect("Batch should exist while waiting for it");
        if !session.running {
            return session;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!(
                "Timeout waiting for batch {} to finish; stats so far: {:?}",
                id.get(),
                session.stats
            );
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

/// Wait for the first event matching a predicate
pub async fn wait_for_event<F>(
    events: &mut broadcast::Receiver<Event>,
    timeout: Duration,
    predicate: F,
) -> Option<Event>
where
    F: Fn(&Event) -> bool,
{
    let scan = async {
        while let Ok(event) = events.recv().await {
            if predicate(&event) {
                return Some(event);
            }
        }
        None
    };

    tokio::time::timeout(timeout, scan).await.ok().flatten()
}

/// Collect all events until timeout or the stop predicate is satisfied
pub async fn collect_events_until<F>(
    events: &mut broadcast::Receiver<Event>,
    timeout: Duration,
    stop_predicate: F,
) -> Vec<Event>
where
    F: Fn(&Event) -> bool,
{
    let mut collected = Vec::new();

    let drain = async {
        while let Ok(event) = events.recv().await {
            let stop = stop_predicate(&event);
            collected.push(event);
            if stop {
                break;
            }
        }
    };
    let _ = tokio::time::timeout(timeout, drain).await;

    collected
}

/// Assert that a finished session landed on the expected counts
pub fn assert_batch_outcome(
    session: &SessionInfo,
    completed: usize,
    skipped: usize,
    failed: usize,
) {
    assert_eq!(
        session.stats.completed, completed,
        "completed count mismatch for batch {}: {:?}",
        session.reference, session.stats
    );
    assert_eq!(
        session.stats.skipped, skipped,
        "skipped count mismatch for batch {}: {:?}",
        session.reference, session.stats
    );
    assert_eq!(
        session.stats.failed, failed,
        "failed count mismatch for batch {}: {:?}",
        session.reference, session.stats
    );
    assert!(
        !session.running,
        "session {} should no longer be running",
        session.reference
    );
}

/// Assert that files exist in the batch output directory
pub fn assert_files_exist(dir: &Path, expected_files: &[&str]) {
    for name in expected_files {
        assert!(
            dir.join(name).exists(),
            "missing expected file '{name}' in {dir:?}"
        );
    }
}

/// Assert that a directory is not empty
pub fn assert_dir_not_empty(dir: &Path) {
    assert!(dir.exists(), "directory {dir:?} does not exist");
    let count = std::fs::read_dir(dir).expect("read_dir failed").count();
    assert!(count > 0, "directory {dir:?} is empty");
}

/// Sorted names of audio files directly inside `dir`
pub fn audio_files_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("Failed to read batch directory")
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .is_some_and(|ext| ext == "mp3" || ext == "m4a" || ext == "opus" || ext == "flac")
        })
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
