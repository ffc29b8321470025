//! External download engines
//!
//! This module provides a trait-based architecture for delegating the actual
//! media transfer to external command-line tools. The coordinator never
//! downloads anything itself; it classifies each request and hands it to the
//! engine that claims it.
//!
//! ## Architecture
//!
//! The core abstraction is the [`DownloadEngine`] trait, which defines the
//! interface for fetching one track and for expanding a collection URL into
//! its member tracks. Two implementations are provided:
//!
//! - [`YtDlpEngine`]: Uses the external `yt-dlp` binary for direct media URLs,
//!   playlists, and free-text searches
//! - [`SpotdlEngine`]: Uses the external `spotdl` binary for Spotify links
//!
//! Engine output is machine-parsed rather than scraped: yt-dlp is asked to
//! print a tab-separated track report via `--print`, and spotdl writes its
//! track lists to a JSON save file. Failures are classified into the
//! [`FetchError`](crate::error::FetchError) taxonomy by inspecting the
//! captured stdout/stderr.
//!
//! ## Usage
//!
//! ```no_run
//! use music_dl::engine::{DownloadEngine, FetchOptions, YtDlpEngine};
//! use music_dl::types::{Quality, RequestKind};
//! use std::path::PathBuf;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Try to find yt-dlp in PATH
//!     let engine = YtDlpEngine::from_path()
//!         .expect("yt-dlp binary not found");
//!
//!     let options = FetchOptions {
//!         dest_dir: PathBuf::from("/music/batch_20250101_120000"),
//!         quality: Quality::K320,
//!         embed_thumbnail: true,
//!         socket_timeout: Duration::from_secs(15),
//!         retries: 3,
//!         fragment_retries: 3,
//!         concurrent_fragments: 8,
//!         ffmpeg_location: None,
//!     };
//!
//!     let track = engine
//!         .fetch("https://youtu.be/dQw4w9WgXcQ", &options)
//!         .await?;
//!     println!("downloaded {} as {}", track.title, track.identifier);
//!
//!     Ok(())
//! }
//! ```

mod parser;
mod spotdl;
mod traits;
mod ytdlp;

pub use spotdl::SpotdlEngine;
pub use traits::{DownloadEngine, FetchOptions, FetchedTrack, TrackRef};
pub use ytdlp::YtDlpEngine;
