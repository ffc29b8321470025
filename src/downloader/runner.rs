//! Background batch runner: expansion, ordered dispatch, and finalization
//!
//! One runner task exists per submitted batch. It expands collection URLs
//! into individual tracks, walks the items in submission order, skips
//! anything already archived before a worker is ever engaged, and hands the
//! rest to the bounded worker pool. When every item is terminal it writes
//! the final tally, optionally packages the batch directory, and trims
//! session history.

use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::db::NewSessionItem;
use crate::engine::FetchOptions;
use crate::error::{Error, FetchError};
use crate::input;
use crate::types::{BatchId, BatchStats, DownloadRequest, Event, ItemStatus, RequestKind};

use super::{packaging, MusicDownloader};

/// Everything a batch runner needs, captured at submission time
pub(crate) struct RunnerContext {
    pub(crate) downloader: MusicDownloader,
    pub(crate) id: BatchId,
    pub(crate) reference: String,
    pub(crate) requests: Vec<DownloadRequest>,
    pub(crate) fetch_options: FetchOptions,
    pub(crate) cancel_token: CancellationToken,
    pub(crate) auto_zip: bool,
    pub(crate) max_history: usize,
}

/// Per-item state handed to a worker task
struct WorkerContext {
    downloader: MusicDownloader,
    id: BatchId,
    request: DownloadRequest,
    fetch_options: Arc<FetchOptions>,
}

/// Drive a batch from expansion through finalization
///
/// Runs as a spawned task; errors are logged and folded into item/batch
/// state rather than propagated, so one bad item never takes down the
/// coordinator.
pub(crate) async fn run_batch(ctx: RunnerContext) {
    let RunnerContext {
        downloader,
        id,
        reference,
        requests,
        fetch_options,
        cancel_token,
        auto_zip,
        max_history,
    } = ctx;

    // Phase 1: expand collection URLs into individual tracks. Failures fall
    // back to the original line as a single opaque item.
    let requests = downloader.expand_requests(requests, &fetch_options).await;
    let total = requests.len();

    let items: Vec<NewSessionItem> = requests
        .iter()
        .map(|request| NewSessionItem {
            session_id: id,
            position: request.position as i64,
            input: request.input.clone(),
            title: request.title.clone(),
        })
        .collect();

    let persisted = async {
        downloader.db.update_session_total(id, total as i64).await?;
        downloader.db.insert_session_items(&items).await
    }
    .await;
    if let Err(e) = persisted {
        tracing::error!(batch_id = id.0, error = %e, "Failed to persist batch items");
        downloader.log_line("FAIL", format!("batch {reference}: could not be recorded: {e}"));
        let stats = BatchStats {
            total,
            failed: total,
            ..BatchStats::default()
        };
        finish_batch(&downloader, id, &reference, stats, None, max_history).await;
        return;
    }

    downloader.emit_event(Event::BatchStarted {
        id,
        reference: reference.clone(),
        total,
    });
    downloader.log_line("START", format!("batch {reference}: {total} item(s)"));

    // Phase 2: walk items in order. Archive hits and post-stop items resolve
    // inline; everything else waits for a pool permit and runs on a worker.
    let mut stats = BatchStats {
        total,
        ..BatchStats::default()
    };
    let mut workers: JoinSet<ItemStatus> = JoinSet::new();
    let fetch_options = Arc::new(fetch_options);

    for request in requests {
        if cancel_token.is_cancelled() {
            resolve_stopped(&downloader, id, &request, &mut stats).await;
            continue;
        }

        if let Some(identifier) = input::resolve_identifier(&request.input) {
            if downloader.archive.contains(&identifier).await {
                let reason = format!("already archived: {identifier}");
                skip_item(&downloader, id, &request, &reason).await;
                stats.skipped += 1;
                continue;
            }
        }

        let permit = tokio::select! {
            biased;
            _ = cancel_token.cancelled() => None,
            permit = downloader
                .worker_state
                .concurrent_limit
                .clone()
                .acquire_owned() => permit.ok(),
        };
        let Some(permit) = permit else {
            // Stop arrived while this item was waiting for a slot
            resolve_stopped(&downloader, id, &request, &mut stats).await;
            continue;
        };

        if let Err(e) = downloader
            .db
            .mark_item_dispatched(id, request.position as i64)
            .await
        {
            tracing::error!(batch_id = id.0, position = request.position, error = %e, "Failed to mark item dispatched");
        }
        downloader.emit_event(Event::ItemDispatched {
            id,
            position: request.position,
            input: request.input.clone(),
        });
        downloader.log_line(
            "GET",
            format!("#{} {}", request.position + 1, request.input),
        );

        let worker = WorkerContext {
            downloader: downloader.clone(),
            id,
            request,
            fetch_options: Arc::clone(&fetch_options),
        };
        workers.spawn(async move {
            let _permit = permit;
            run_item(worker).await
        });
    }

    // Phase 3: wait for every in-flight worker and tally outcomes
    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok(ItemStatus::Success) => stats.completed += 1,
            Ok(ItemStatus::Skipped) => stats.skipped += 1,
            Ok(_) => stats.failed += 1,
            Err(e) => {
                // Worker panicked; its row stays Dispatched but the batch
                // still terminates with the item counted as failed
                tracing::error!(batch_id = id.0, error = %e, "Download worker panicked");
                stats.failed += 1;
            }
        }
    }

    // Phase 4: package and finalize
    let zip_path = if stats.completed > 0 && auto_zip {
        match packaging::package_batch_dir(
            &fetch_options.dest_dir,
            &downloader.config.batch.audio_extensions,
        )
        .await
        {
            Ok(path) => {
                downloader.log_line("ZIP", format!("packaged {}", path.display()));
                Some(path)
            }
            Err(e) => {
                tracing::warn!(batch_id = id.0, error = %e, "Failed to package batch directory");
                downloader.log_line("WARN", format!("packaging failed: {e}"));
                None
            }
        }
    } else {
        None
    };

    finish_batch(&downloader, id, &reference, stats, zip_path, max_history).await;
}

/// Write the final session record, trim history, and announce completion
async fn finish_batch(
    downloader: &MusicDownloader,
    id: BatchId,
    reference: &str,
    stats: BatchStats,
    zip_path: Option<std::path::PathBuf>,
    max_history: usize,
) {
    let finished_at = Utc::now().timestamp();
    if let Err(e) = downloader
        .db
        .finalize_session(id, &stats, zip_path.as_deref(), finished_at)
        .await
    {
        tracing::error!(batch_id = id.0, error = %e, "Failed to finalize session");
    }

    match downloader.db.delete_sessions_beyond(max_history).await {
        Ok(removed) if removed > 0 => {
            tracing::debug!(removed, "Trimmed session history");
        }
        Ok(_) => {}
        Err(e) => {
            tracing::warn!(error = %e, "Failed to trim session history");
        }
    }

    downloader.emit_event(Event::BatchCompleted {
        id,
        stats: stats.clone(),
        zip_path,
    });
    downloader.log_line(
        "DONE",
        format!(
            "batch {reference}: {} downloaded, {} skipped, {} failed",
            stats.completed, stats.skipped, stats.failed
        ),
    );

    let mut active = downloader.worker_state.active_batches.lock().await;
    active.remove(&id);
}

/// Resolve one item on a worker: pick an engine, fetch, archive, record
///
/// Always returns a terminal [`ItemStatus`]; every error path writes the
/// item row and emits the matching event before returning.
async fn run_item(worker: WorkerContext) -> ItemStatus {
    let WorkerContext {
        downloader,
        id,
        request,
        fetch_options,
    } = worker;

    let Some(engine) = downloader.engine_for(&request.input, request.kind) else {
        let reason = match request.kind {
            RequestKind::StreamingUrl => "streaming engine (spotdl) is not installed",
            _ => "media engine (yt-dlp) is not installed",
        };
        fail_item(&downloader, id, &request, reason).await;
        return ItemStatus::Failed;
    };

    match engine.fetch(&request.input, &fetch_options).await {
        Ok(track) => {
            match downloader.archive.record(&track.identifier).await {
                Ok(true) => {
                    if let Err(e) = downloader
                        .db
                        .mark_item_success(
                            id,
                            request.position as i64,
                            Some(&track.title),
                            &track.identifier,
                        )
                        .await
                    {
                        tracing::error!(batch_id = id.0, position = request.position, error = %e, "Failed to mark item success");
                    }
                    downloader.emit_event(Event::ItemCompleted {
                        id,
                        position: request.position,
                        title: track.title.clone(),
                        identifier: track.identifier.clone(),
                    });
                    downloader.log_line(
                        "OK",
                        format!("#{} {}", request.position + 1, track.title),
                    );
                    ItemStatus::Success
                }
                Ok(false) => {
                    // Another worker archived the same identifier while this
                    // fetch was in flight
                    let reason =
                        format!("duplicate resolved mid-batch: {}", track.identifier);
                    skip_item(&downloader, id, &request, &reason).await;
                    ItemStatus::Skipped
                }
                Err(e) => {
                    // A success that cannot be archived is reported as a
                    // failure so the identifier stays eligible for retry
                    let reason = format!("downloaded but archive append failed: {e}");
                    fail_item(&downloader, id, &request, &reason).await;
                    ItemStatus::Failed
                }
            }
        }
        Err(Error::Fetch(FetchError::DuplicateSkip { identifier })) => {
            let reason = format!("already downloaded: {identifier}");
            skip_item(&downloader, id, &request, &reason).await;
            ItemStatus::Skipped
        }
        Err(e) => {
            let reason = match &e {
                Error::Fetch(fetch) => fetch.to_string(),
                other => other.to_string(),
            };
            fail_item(&downloader, id, &request, &reason).await;
            ItemStatus::Failed
        }
    }
}

/// Mark an item skipped and emit the matching event and log line
async fn skip_item(
    downloader: &MusicDownloader,
    id: BatchId,
    request: &DownloadRequest,
    reason: &str,
) {
    if let Err(e) = downloader
        .db
        .mark_item_skipped(id, request.position as i64, reason)
        .await
    {
        tracing::error!(batch_id = id.0, position = request.position, error = %e, "Failed to mark item skipped");
    }
    downloader.emit_event(Event::ItemSkipped {
        id,
        position: request.position,
        reason: reason.to_string(),
    });
    downloader.log_line(
        "SKIP",
        format!("#{} {}: {reason}", request.position + 1, request.input),
    );
}

/// Mark an item failed and emit the matching event and log line
async fn fail_item(
    downloader: &MusicDownloader,
    id: BatchId,
    request: &DownloadRequest,
    reason: &str,
) {
    if let Err(e) = downloader
        .db
        .mark_item_failed(id, request.position as i64, reason)
        .await
    {
        tracing::error!(batch_id = id.0, position = request.position, error = %e, "Failed to mark item failed");
    }
    downloader.emit_event(Event::ItemFailed {
        id,
        position: request.position,
        error: reason.to_string(),
    });
    downloader.log_line(
        "FAIL",
        format!("#{} {}: {reason}", request.position + 1, request.input),
    );
}

/// Resolve an item that was never dispatched because the batch was stopped
async fn resolve_stopped(
    downloader: &MusicDownloader,
    id: BatchId,
    request: &DownloadRequest,
    stats: &mut BatchStats,
) {
    fail_item(downloader, id, request, "batch stopped").await;
    stats.failed += 1;
}
