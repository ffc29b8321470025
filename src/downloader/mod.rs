//! Core batch coordinator implementation split into focused submodules.
//!
//! The `MusicDownloader` struct and its methods are organized by domain:
//! - [`batch`] - Batch submission and request expansion
//! - [`runner`] - Per-batch dispatch loop and item workers
//! - [`control`] - Batch lifecycle control (stop/inspect/list)
//! - [`maintenance`] - Archive, history, and settings operations
//! - [`log_buffer`] - Shared live log line buffer
//! - [`packaging`] - Zip packaging of finished batch directories
//! - [`lifecycle`] - Startup and shutdown coordination

mod batch;
mod control;
mod lifecycle;
pub(crate) mod log_buffer;
mod maintenance;
mod packaging;
mod runner;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use crate::archive::DownloadArchive;
use crate::config::Config;
use crate::db::Database;
use crate::engine::{DownloadEngine, SpotdlEngine, YtDlpEngine};
use crate::error::{Error, Result};
use crate::types::{BatchId, EngineInfo};

use log_buffer::LogBuffer;

/// Worker pool and active batch tracking
#[derive(Clone)]
pub(crate) struct WorkerState {
    /// Semaphore bounding concurrent item dispatches (respects workers config)
    pub(crate) concurrent_limit: std::sync::Arc<tokio::sync::Semaphore>,
    /// Map of running batches to their stop tokens
    pub(crate) active_batches: std::sync::Arc<
        tokio::sync::Mutex<
            std::collections::HashMap<BatchId, tokio_util::sync::CancellationToken>,
        >,
    >,
    /// Flag to indicate whether new batches are accepted (set to false during shutdown)
    pub(crate) accepting_new: std::sync::Arc<std::sync::atomic::AtomicBool>,
}

/// Download engines and the availability snapshot taken at startup
#[derive(Clone)]
pub(crate) struct Engines {
    /// General-purpose media engine (yt-dlp); None when the binary is absent
    pub(crate) media: Option<std::sync::Arc<dyn DownloadEngine>>,
    /// Streaming-service engine (spotdl); None when the binary is absent
    pub(crate) streaming: Option<std::sync::Arc<dyn DownloadEngine>>,
    /// Probed media engine availability and version
    pub(crate) media_info: EngineInfo,
    /// Probed streaming engine availability and version
    pub(crate) streaming_info: EngineInfo,
}

/// Main coordinator instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct MusicDownloader {
    /// Database instance for persistence (wrapped in Arc for sharing across tasks)
    /// Public for integration tests to query session status
    pub db: std::sync::Arc<Database>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<crate::types::Event>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: std::sync::Arc<Config>,
    /// Download archive guarding against duplicate downloads
    pub(crate) archive: std::sync::Arc<DownloadArchive>,
    /// Shared live log line buffer
    pub(crate) log: LogBuffer,
    /// Worker pool and active batch tracking
    pub(crate) worker_state: WorkerState,
    /// Download engines and startup availability snapshot
    pub(crate) engines: Engines,
}

impl MusicDownloader {
    /// Create a new MusicDownloader instance
    ///
    /// This initializes all core components:
    /// - Creates the root download directory
    /// - Opens/creates the SQLite database and runs migrations
    /// - Loads the download archive into memory
    /// - Discovers and probes the external engine binaries
    /// - Verifies the required encoding tool is present (the only fatal
    ///   startup condition; a missing engine degrades to per-item failures)
    pub async fn new(config: Config) -> Result<Self> {
        // Ensure the root download directory exists
        let root_dir = config.root_dir();
        tokio::fs::create_dir_all(&root_dir).await.map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to create download directory '{}': {}",
                    root_dir.display(),
                    e
                ),
            ))
        })?;

        // Initialize database
        let db = Database::new(&config.persistence.database_path).await?;

        // Load the archive of previously downloaded identifiers
        let archive = DownloadArchive::load(config.archive_path()).await?;

        // Create broadcast channel with buffer size of 1000 events
        // This allows multiple subscribers to receive all events independently
        let (event_tx, _rx) = tokio::sync::broadcast::channel(1000);

        // Discover engines: explicit path wins, then PATH search
        let media: Option<std::sync::Arc<dyn DownloadEngine>> =
            if let Some(ref path) = config.tools.ytdlp_path {
                Some(std::sync::Arc::new(YtDlpEngine::new(path.clone())))
            } else if config.tools.search_path {
                YtDlpEngine::from_path()
                    .map(|e| std::sync::Arc::new(e) as std::sync::Arc<dyn DownloadEngine>)
            } else {
                None
            };

        let streaming: Option<std::sync::Arc<dyn DownloadEngine>> =
            if let Some(ref path) = config.tools.spotdl_path {
                Some(std::sync::Arc::new(SpotdlEngine::new(path.clone())))
            } else if config.tools.search_path {
                SpotdlEngine::from_path()
                    .map(|e| std::sync::Arc::new(e) as std::sync::Arc<dyn DownloadEngine>)
            } else {
                None
            };

        let media_info = probe_engine("yt-dlp", media.as_deref()).await;
        let streaming_info = probe_engine("spotdl", streaming.as_deref()).await;

        tracing::info!(
            media_available = media_info.available,
            media_version = media_info.version.as_deref().unwrap_or("-"),
            streaming_available = streaming_info.available,
            streaming_version = streaming_info.version.as_deref().unwrap_or("-"),
            "Download engines initialized"
        );

        // The encoding tool is required for audio extraction; engines invoke
        // it mid-download, so a missing binary must surface now rather than
        // as a CodecError halfway through the first batch
        verify_encoder(&config).await?;

        // Create semaphore for concurrent dispatch limiting
        let concurrent_limit =
            std::sync::Arc::new(tokio::sync::Semaphore::new(config.batch.workers));

        // Group worker pool state
        let worker_state = WorkerState {
            concurrent_limit,
            active_batches: std::sync::Arc::new(tokio::sync::Mutex::new(
                std::collections::HashMap::new(),
            )),
            accepting_new: std::sync::Arc::new(std::sync::atomic::AtomicBool::new(true)),
        };

        // Group engines with their startup availability snapshot
        let engines = Engines {
            media,
            streaming,
            media_info,
            streaming_info,
        };

        Ok(Self {
            db: std::sync::Arc::new(db),
            event_tx,
            config: std::sync::Arc::new(config),
            archive: std::sync::Arc::new(archive),
            log: LogBuffer::new(),
            worker_state,
            engines,
        })
    }

    /// Subscribe to coordinator events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all events independently.
    /// Events are buffered, but if a subscriber falls behind by more than 1000 events,
    /// it will receive a `RecvError::Lagged` error.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use music_dl::{MusicDownloader, Config};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let downloader = MusicDownloader::new(Config::default()).await?;
    ///
    ///     let mut events = downloader.subscribe();
    ///     tokio::spawn(async move {
    ///         while let Ok(event) = events.recv().await {
    ///             tracing::info!(?event, "batch event");
    ///         }
    ///     });
    ///
    ///     Ok(())
    /// }
    /// ```
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<crate::types::Event> {
        self.event_tx.subscribe()
    }

    /// Hand out a reference to the startup configuration (an `Arc` bump).
    pub fn get_config(&self) -> std::sync::Arc<Config> {
        std::sync::Arc::clone(&self.config)
    }

    /// Query the current system capabilities
    ///
    /// Returns the engine availability snapshot taken at startup, including
    /// probed version strings.
    pub fn capabilities(&self) -> crate::types::Capabilities {
        crate::types::Capabilities {
            media_engine: self.engines.media_info.clone(),
            streaming_engine: self.engines.streaming_info.clone(),
            // construction fails when the encoder is missing, so a live
            // instance always has it
            encoder_present: true,
        }
    }

    /// Emit an event to all subscribers
    ///
    /// If there are no active subscribers, the event is silently dropped (ok() converts Err to None).
    /// This allows batch processing to continue even if no one is listening to events.
    pub(crate) fn emit_event(&self, event: crate::types::Event) {
        // send() returns Err if there are no receivers, which is fine - we just drop the event
        self.event_tx.send(event).ok();
    }

    /// Append a formatted line to the live log, tracing, and the event stream
    pub(crate) fn log_line(&self, level: &str, message: impl AsRef<str>) {
        let message = message.as_ref();
        let line = self.log.push(level, message);
        tracing::info!(target: "music_dl::batch", "{}", message);
        self.emit_event(crate::types::Event::LogLine { line });
    }

    /// Pick the engine that claims an input, if any is available
    pub(crate) fn engine_for(
        &self,
        input: &str,
        kind: crate::types::RequestKind,
    ) -> Option<std::sync::Arc<dyn DownloadEngine>> {
        [&self.engines.streaming, &self.engines.media]
            .into_iter()
            .flatten()
            .find(|engine| engine.supports(input, kind))
            .cloned()
    }

    /// Spawn the REST API server in a background task
    ///
    /// This method spawns the API server as a separate async task using `tokio::spawn`.
    /// The server runs concurrently with batch processing and listens on the configured
    /// bind address (default: 127.0.0.1:7860).
    pub fn spawn_api_server(self: &std::sync::Arc<Self>) -> tokio::task::JoinHandle<Result<()>> {
        let downloader = self.clone();
        let config = self.config.clone();

        tokio::spawn(async move { crate::api::start_api_server(downloader, config).await })
    }
}

/// Probe one engine for availability and version
async fn probe_engine(name: &str, engine: Option<&dyn DownloadEngine>) -> EngineInfo {
    match engine {
        Some(engine) => {
            let version = engine.probe().await;
            EngineInfo {
                name: engine.name().to_string(),
                available: true,
                version,
            }
        }
        None => EngineInfo {
            name: name.to_string(),
            available: false,
            version: None,
        },
    }
}

/// Verify the required encoding tool exists, either at the configured path
/// or somewhere in PATH
async fn verify_encoder(config: &Config) -> Result<()> {
    if let Some(ref path) = config.tools.ffmpeg_path {
        if tokio::fs::metadata(path).await.is_ok() {
            return Ok(());
        }
        return Err(Error::EncoderMissing {
            tool: format!("ffmpeg (configured at {})", path.display()),
        });
    }

    if which::which("ffmpeg").is_ok() {
        return Ok(());
    }

    Err(Error::EncoderMissing {
        tool: "ffmpeg".to_string(),
    })
}
