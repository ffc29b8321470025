//! # music-dl
//!
//! Backend library for coordinating batched music downloads.
//!
//! ## Design Philosophy
//!
//! music-dl is designed to be:
//! - **Batch-oriented** - Paste a list of URLs and search queries, get a folder and a zip
//! - **Duplicate-aware** - A line-keyed archive skips anything already downloaded
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Event-driven** - Consumers subscribe to events, no polling required
//!
//! Retrieval and conversion are delegated to external engines (yt-dlp for
//! general media, spotdl for streaming-service URLs); the crate coordinates
//! dispatch, deduplication, persistence, and packaging around them.
//!
//! ## Quick Start
//!
//! ```no_run
//! use music_dl::{Config, MusicDownloader};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let downloader = MusicDownloader::new(config).await?;
//!
//!     // Subscribe to events
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     // Submit a batch and let it run in the background
//!     let session = downloader
//!         .submit_batch(
//!             "https://www.youtube.com/watch?v=dQw4w9WgXcQ\nnever gonna give you up",
//!             Default::default(),
//!         )
//!         .await?;
//!     println!("batch {} started", session.reference);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Line-keyed dedup archive
pub mod archive;
/// Configuration types
pub mod config;
/// Database persistence layer
pub mod db;
/// Core coordinator implementation (decomposed into focused submodules)
pub mod downloader;
/// External download engines (yt-dlp, spotdl)
pub mod engine;
/// Error types
pub mod error;
/// Input line parsing and classification
pub mod input;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use archive::DownloadArchive;
pub use config::Config;
pub use db::Database;
pub use downloader::MusicDownloader;
pub use engine::{DownloadEngine, FetchOptions, FetchedTrack, TrackRef};
pub use error::{
    ApiError, BatchError, DatabaseError, Error, ErrorDetail, FetchError, Result, ToHttpStatus,
};
pub use types::{
    BatchId, BatchOptions, BatchStats, Capabilities, DownloadRequest, EngineInfo, Event,
    HistoryStats, ItemInfo, ItemStatus, Quality, RequestKind, SessionInfo, SettingsUpdate,
    UserSettings,
};

/// Run the coordinator until the process receives a termination signal.
///
/// On Unix this waits for SIGTERM or SIGINT, falling back to `ctrl_c`
/// if handler registration fails (as it can in minimal containers);
/// elsewhere it waits for Ctrl+C. The downloader's `shutdown()` runs
/// once the signal arrives.
///
/// ```no_run
/// use music_dl::{Config, MusicDownloader, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Config::default();
///     let downloader = MusicDownloader::new(config).await?;
///
///     // Run with automatic signal handling
///     run_with_shutdown(downloader).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(downloader: MusicDownloader) -> Result<()> {
    wait_for_signal().await;
    downloader.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(mut term), Ok(mut int)) => {
            tokio::select! {
                _ = term.recv() => tracing::info!("SIGTERM received"),
                _ = int.recv() => tracing::info!("SIGINT received"),
            }
        }
        (Ok(mut term), Err(e)) => {
            tracing::warn!(error = %e, "SIGINT handler unavailable, waiting on SIGTERM");
            term.recv().await;
            tracing::info!("SIGTERM received");
        }
        (Err(e), Ok(mut int)) => {
            tracing::warn!(error = %e, "SIGTERM handler unavailable, waiting on SIGINT");
            int.recv().await;
            tracing::info!("SIGINT received");
        }
        (Err(_), Err(_)) => {
            // Registration can fail in restricted environments; ctrl_c still works
            tracing::warn!("signal handlers unavailable, falling back to ctrl_c");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        return;
    }
    tracing::info!("Ctrl+C received");
}
