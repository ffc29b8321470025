//! yt-dlp engine for direct URLs, playlists and search queries

use super::parser::{classify_failure, parse_expansion_output, parse_track_line, parse_version};
use super::traits::{DownloadEngine, FetchOptions, FetchedTrack, TrackRef};
use crate::error::FetchError;
use crate::input;
use crate::types::RequestKind;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::debug;

/// Audio format selector: prefer m4a audio, fall back to best available
const FORMAT_SELECTOR: &str = "bestaudio[ext=m4a]/bestaudio/best";

/// Tab-separated report printed after a completed fetch; parsed by
/// [`parse_track_line`]
const TRACK_PRINT: &str = "after_move:%(extractor)s %(id)s\t%(title)s\t%(artist,uploader)s\t%(filepath)s";

/// Engine backed by the external `yt-dlp` binary
///
/// Handles direct media URLs, playlist expansion and free-text searches
/// (prefixed with `ytsearch:`). Audio is extracted to mp3 at the requested
/// bitrate by yt-dlp's own ffmpeg postprocessor.
pub struct YtDlpEngine {
    binary_path: PathBuf,
}

impl YtDlpEngine {
    /// Create a new engine with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }

    /// Attempt to find yt-dlp in PATH
    ///
    /// Returns `Some(YtDlpEngine)` if the binary is found, `None` otherwise.
    pub fn from_path() -> Option<Self> {
        which::which("yt-dlp").ok().map(Self::new)
    }

    /// Build the argument list for fetching one item
    fn fetch_args(&self, input: &str, options: &FetchOptions) -> Vec<String> {
        let target = if input::is_url(input) {
            input.to_string()
        } else {
            format!("ytsearch:{input}")
        };

        let mut args = vec![
            "-f".to_string(),
            FORMAT_SELECTOR.to_string(),
            "-x".to_string(),
            "--audio-format".to_string(),
            "mp3".to_string(),
            "--audio-quality".to_string(),
            format!("{}K", options.quality.kbps()),
            "--socket-timeout".to_string(),
            options.socket_timeout.as_secs().to_string(),
            "--retries".to_string(),
            options.retries.to_string(),
            "--fragment-retries".to_string(),
            options.fragment_retries.to_string(),
            "--concurrent-fragments".to_string(),
            options.concurrent_fragments.to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
        ];

        if options.embed_thumbnail {
            args.push("--embed-thumbnail".to_string());
            args.push("--embed-metadata".to_string());
        }

        if let Some(ffmpeg) = &options.ffmpeg_location {
            args.push("--ffmpeg-location".to_string());
            args.push(ffmpeg.display().to_string());
        }

        args.push("-o".to_string());
        args.push(
            options
                .dest_dir
                .join("%(title)s.%(ext)s")
                .display()
                .to_string(),
        );

        args.push("--no-simulate".to_string());
        args.push("--print".to_string());
        args.push(TRACK_PRINT.to_string());

        args.push(target);
        args
    }

    /// Build the argument list for expanding a playlist without downloading
    fn expand_args(&self, input: &str, options: &FetchOptions) -> Vec<String> {
        vec![
            "--flat-playlist".to_string(),
            "--no-warnings".to_string(),
            "--socket-timeout".to_string(),
            options.socket_timeout.as_secs().to_string(),
            "--print".to_string(),
            "%(url)s\t%(title)s".to_string(),
            input.to_string(),
        ]
    }
}

#[async_trait]
impl DownloadEngine for YtDlpEngine {
    fn supports(&self, _input: &str, kind: RequestKind) -> bool {
        matches!(
            kind,
            RequestKind::MediaUrl | RequestKind::PlaylistUrl | RequestKind::SearchQuery
        )
    }

    async fn expand(&self, input: &str, options: &FetchOptions) -> crate::Result<Vec<TrackRef>> {
        let args = self.expand_args(input, options);
        debug!(input, "expanding playlist via yt-dlp");

        let output = Command::new(&self.binary_path)
            .args(&args)
            .output()
            .await
            .map_err(|e| {
                crate::Error::Fetch(FetchError::EngineFailure {
                    engine: self.name().to_string(),
                    reason: format!("failed to execute {}: {e}", self.binary_path.display()),
                })
            })?;

        if !output.status.success() {
            return Err(crate::Error::Fetch(classify_failure(
                self.name(),
                input,
                options.socket_timeout.as_secs(),
                &output.stdout,
                &output.stderr,
            )));
        }

        Ok(parse_expansion_output(&output.stdout))
    }

    async fn fetch(&self, input: &str, options: &FetchOptions) -> crate::Result<FetchedTrack> {
        let args = self.fetch_args(input, options);
        debug!(input, "fetching via yt-dlp");

        let output = Command::new(&self.binary_path)
            .args(&args)
            .output()
            .await
            .map_err(|e| {
                crate::Error::Fetch(FetchError::EngineFailure {
                    engine: self.name().to_string(),
                    reason: format!("failed to execute {}: {e}", self.binary_path.display()),
                })
            })?;

        if !output.status.success() {
            return Err(crate::Error::Fetch(classify_failure(
                self.name(),
                input,
                options.socket_timeout.as_secs(),
                &output.stdout,
                &output.stderr,
            )));
        }

        parse_track_line(&output.stdout).ok_or_else(|| {
            crate::Error::Fetch(FetchError::EngineFailure {
                engine: self.name().to_string(),
                reason: "engine exited successfully but printed no track report".to_string(),
            })
        })
    }

    async fn probe(&self) -> Option<String> {
        let output = Command::new(&self.binary_path)
            .arg("--version")
            .output()
            .await
            .ok()?;
        if !output.status.success() {
            return None;
        }
        parse_version(&output.stdout)
    }

    fn name(&self) -> &'static str {
        "yt-dlp"
    }
}
