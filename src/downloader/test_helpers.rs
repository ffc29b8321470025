//! Shared test helpers for creating MusicDownloader instances in tests.

use crate::archive::DownloadArchive;
use crate::config::Config;
use crate::db::Database;
use crate::downloader::log_buffer::LogBuffer;
use crate::downloader::{Engines, MusicDownloader, WorkerState};
use crate::engine::{DownloadEngine, FetchOptions, FetchedTrack, TrackRef};
use crate::error::{Error, FetchError};
use crate::types::{BatchId, EngineInfo, RequestKind, SessionInfo};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

/// What a scripted fetch should do for a given input line
#[derive(Clone, Debug)]
pub(crate) enum ScriptedOutcome {
    /// Resolve with the given identifier and title, writing a fake audio file
    Success { identifier: String, title: String },
    /// Report the engine-level "already downloaded" skip
    Duplicate { identifier: String },
    /// Fail with a network timeout
    Timeout,
    /// Fail with an unavailable-resource error
    Unavailable { reason: String },
}

/// In-process stand-in for an external download engine
///
/// Every fetch consults a per-input script; unscripted inputs succeed with a
/// derived identifier. The engine tracks how many fetches run at once so
/// tests can assert the worker pool bound without real subprocesses.
pub(crate) struct ScriptedEngine {
    outcomes: std::sync::Mutex<HashMap<String, ScriptedOutcome>>,
    expansions: std::sync::Mutex<HashMap<String, Vec<TrackRef>>>,
    delay: std::sync::Mutex<Option<Duration>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    fetched: std::sync::Mutex<Vec<String>>,
}

impl ScriptedEngine {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            outcomes: std::sync::Mutex::new(HashMap::new()),
            expansions: std::sync::Mutex::new(HashMap::new()),
            delay: std::sync::Mutex::new(None),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            fetched: std::sync::Mutex::new(Vec::new()),
        })
    }

    /// Script the outcome of fetching `input`
    pub(crate) fn script(&self, input: &str, outcome: ScriptedOutcome) {
        self.outcomes
            .lock()
            .unwrap()
            .insert(input.to_string(), outcome);
    }

    /// Script the expansion of a collection `input` into tracks
    pub(crate) fn script_expansion(&self, input: &str, tracks: Vec<TrackRef>) {
        self.expansions
            .lock()
            .unwrap()
            .insert(input.to_string(), tracks);
    }

    /// Make every fetch take at least `delay` (for concurrency assertions)
    pub(crate) fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// Highest number of fetches observed running at the same time
    pub(crate) fn max_concurrency(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Inputs fetched so far, in completion-start order
    pub(crate) fn fetched_inputs(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl DownloadEngine for ScriptedEngine {
    fn supports(&self, _input: &str, _kind: RequestKind) -> bool {
        true
    }

    async fn expand(&self, input: &str, _options: &FetchOptions) -> crate::Result<Vec<TrackRef>> {
        let scripted = self.expansions.lock().unwrap().get(input).cloned();
        Ok(scripted.unwrap_or_default())
    }

    async fn fetch(&self, input: &str, options: &FetchOptions) -> crate::Result<FetchedTrack> {
        self.fetched.lock().unwrap().push(input.to_string());

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .get(input)
            .cloned()
            .unwrap_or_else(|| ScriptedOutcome::Success {
                identifier: format!("test {input}"),
                title: input.to_string(),
            });

        match outcome {
            ScriptedOutcome::Success { identifier, title } => {
                // Path separators in a title must not escape dest_dir; the
                // real engines sanitize filenames the same way
                let file = options
                    .dest_dir
                    .join(format!("{}.mp3", title.replace('/', "_")));
                tokio::fs::write(&file, b"fake audio").await?;
                Ok(FetchedTrack {
                    identifier,
                    title,
                    artist: None,
                    file: Some(file),
                })
            }
            ScriptedOutcome::Duplicate { identifier } => {
                Err(Error::Fetch(FetchError::DuplicateSkip { identifier }))
            }
            ScriptedOutcome::Timeout => Err(Error::Fetch(FetchError::NetworkTimeout {
                input: input.to_string(),
                timeout_secs: options.socket_timeout.as_secs(),
            })),
            ScriptedOutcome::Unavailable { reason } => {
                Err(Error::Fetch(FetchError::UnavailableResource {
                    input: input.to_string(),
                    reason,
                }))
            }
        }
    }

    async fn probe(&self) -> Option<String> {
        Some("scripted 1.0".to_string())
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Helper to create a test MusicDownloader with a scripted engine.
/// Returns the downloader, the engine handle, and the tempdir (which must
/// be kept alive).
pub(crate) async fn create_test_downloader(
) -> (MusicDownloader, Arc<ScriptedEngine>, tempfile::TempDir) {
    create_test_downloader_with_workers(4).await
}

/// Same as [`create_test_downloader`] but with an explicit worker count
pub(crate) async fn create_test_downloader_with_workers(
    workers: usize,
) -> (MusicDownloader, Arc<ScriptedEngine>, tempfile::TempDir) {
    let engine = ScriptedEngine::new();
    let engines = Engines {
        media: Some(engine.clone() as Arc<dyn DownloadEngine>),
        streaming: None,
        media_info: EngineInfo {
            name: "scripted".to_string(),
            available: true,
            version: Some("scripted 1.0".to_string()),
        },
        streaming_info: EngineInfo {
            name: "spotdl".to_string(),
            available: false,
            version: None,
        },
    };

    let (downloader, temp_dir) = assemble_test_downloader(engines, workers).await;
    (downloader, engine, temp_dir)
}

/// Downloader with no engine installed at all (every item must fail)
pub(crate) async fn create_test_downloader_without_engines(
) -> (MusicDownloader, tempfile::TempDir) {
    let engines = Engines {
        media: None,
        streaming: None,
        media_info: EngineInfo {
            name: "yt-dlp".to_string(),
            available: false,
            version: None,
        },
        streaming_info: EngineInfo {
            name: "spotdl".to_string(),
            available: false,
            version: None,
        },
    };

    assemble_test_downloader(engines, 4).await
}

async fn assemble_test_downloader(
    engines: Engines,
    workers: usize,
) -> (MusicDownloader, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();

    let mut config = Config::default();
    config.batch.root_dir = temp_dir.path().join("music");
    config.batch.workers = workers;
    config.persistence.database_path = temp_dir.path().join("test.db");

    // Create the batch root inside the temp dir
    std::fs::create_dir_all(&config.batch.root_dir).unwrap();

    // Initialize database and archive
    let db = Database::new(&config.persistence.database_path)
        .await
        .unwrap();
    let archive = DownloadArchive::load(config.archive_path()).await.unwrap();

    // Create broadcast channel
    let (event_tx, _rx) = tokio::sync::broadcast::channel(1000);

    // Group worker pool and batch tracking
    let worker_state = WorkerState {
        concurrent_limit: Arc::new(tokio::sync::Semaphore::new(workers)),
        active_batches: Arc::new(tokio::sync::Mutex::new(HashMap::new())),
        accepting_new: Arc::new(std::sync::atomic::AtomicBool::new(true)),
    };

    let downloader = MusicDownloader {
        db: Arc::new(db),
        event_tx,
        config: Arc::new(config),
        archive: Arc::new(archive),
        log: LogBuffer::new(),
        worker_state,
        engines,
    };

    (downloader, temp_dir)
}

/// Poll a batch until its runner finalizes it, panicking after 5 seconds
pub(crate) async fn wait_for_batch(downloader: &MusicDownloader, id: BatchId) -> SessionInfo {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let session = downloader.get_batch(id).await.unwrap();
        if !session.running {
            return session;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("batch {} did not finish within 5s", id.0);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
