//! Traits and types for external download engines

use crate::types::{Quality, RequestKind};
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

/// A track reported by an engine after retrieval and conversion
#[must_use]
#[derive(Debug, Clone)]
pub struct FetchedTrack {
    /// Archive identifier in `<provider> <media-id>` form
    pub identifier: String,
    /// Resolved track title
    pub title: String,
    /// Reported artist, when the engine knows one
    pub artist: Option<String>,
    /// Final audio file path, when the engine reports it
    pub file: Option<PathBuf>,
}

/// One entry discovered while expanding a collection URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRef {
    /// URL (or query) that fetches this entry on its own
    pub input: String,
    /// Display title, if the listing carried one
    pub title: Option<String>,
}

/// Per-item knobs resolved from config, settings and batch options
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Directory the converted audio lands in
    pub dest_dir: PathBuf,
    /// Target bitrate for the conversion step
    pub quality: Quality,
    /// Embed thumbnail and metadata tags
    pub embed_thumbnail: bool,
    /// Per-socket timeout forwarded to the engine
    pub socket_timeout: Duration,
    /// Whole-download retries inside the engine
    pub retries: u32,
    /// Per-fragment retries inside the engine
    pub fragment_retries: u32,
    /// Fragments fetched in parallel for this one item
    pub concurrent_fragments: u32,
    /// Explicit ffmpeg location, when not on PATH
    pub ffmpeg_location: Option<PathBuf>,
}

/// Trait for external download engines
///
/// An engine wraps one external tool (yt-dlp, spotdl) that does the actual
/// retrieval and audio conversion. The coordinator never touches media bytes;
/// it routes each request to the first engine whose [`supports`] accepts it
/// and interprets the engine's outcome.
///
/// [`supports`]: DownloadEngine::supports
#[async_trait]
pub trait DownloadEngine: Send + Sync {
    /// Whether this engine handles the given request
    fn supports(&self, input: &str, kind: RequestKind) -> bool;

    /// Expand a collection URL into its member tracks, in listing order
    ///
    /// # Errors
    ///
    /// Returns an error if the external binary fails to execute or the
    /// listing cannot be read.
    async fn expand(&self, input: &str, options: &FetchOptions) -> crate::Result<Vec<TrackRef>>;

    /// Retrieve one item and convert it to audio in `options.dest_dir`
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::FetchError`] wrapped in [`crate::Error::Fetch`],
    /// categorized from the engine's output: network timeout, unavailable
    /// resource, codec failure, or an unclassified engine failure.
    async fn fetch(&self, input: &str, options: &FetchOptions) -> crate::Result<FetchedTrack>;

    /// Probe the external binary, returning its version string if it runs
    async fn probe(&self) -> Option<String>;

    /// Human-readable name for logging and capability reporting
    fn name(&self) -> &'static str;
}
