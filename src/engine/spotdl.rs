//! spotdl engine for Spotify track and collection URLs

use super::parser::{classify_failure, parse_version};
use super::traits::{DownloadEngine, FetchOptions, FetchedTrack, TrackRef};
use crate::error::FetchError;
use crate::input::{self, SpotifyKind};
use crate::types::RequestKind;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Upper bound for a `spotdl save` metadata lookup
const SAVE_TIMEOUT: Duration = Duration::from_secs(60);

/// Upper bound for one `spotdl download` run. spotdl has no per-socket
/// timeout flag, so a whole-run guard stands in for it.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(600);

/// One entry of a `.spotdl` save file
#[derive(Debug, Deserialize)]
struct SavedTrack {
    url: String,
    name: String,
    #[serde(default)]
    artist: Option<String>,
}

/// Engine backed by the external `spotdl` binary
///
/// Handles Spotify URLs only. Collections (albums, playlists, artist pages)
/// are expanded through `spotdl save`, which resolves the track list without
/// downloading anything; individual tracks go through `spotdl download`.
pub struct SpotdlEngine {
    binary_path: PathBuf,
}

impl SpotdlEngine {
    /// Create a new engine with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }

    /// Attempt to find spotdl in PATH
    ///
    /// Returns `Some(SpotdlEngine)` if the binary is found, `None` otherwise.
    pub fn from_path() -> Option<Self> {
        which::which("spotdl").ok().map(Self::new)
    }

    /// Build the argument list for downloading one track
    fn fetch_args(&self, input: &str, options: &FetchOptions) -> Vec<String> {
        vec![
            "download".to_string(),
            input.to_string(),
            "--format".to_string(),
            "mp3".to_string(),
            "--bitrate".to_string(),
            format!("{}k", options.quality.kbps()),
            "--output".to_string(),
            options.dest_dir.display().to_string(),
        ]
    }
}

/// Parse the track list out of a `.spotdl` save file (a JSON array)
fn parse_save_file(contents: &str) -> crate::Result<Vec<TrackRef>> {
    let saved: Vec<SavedTrack> = serde_json::from_str(contents)?;
    Ok(saved
        .into_iter()
        .map(|track| {
            let title = match &track.artist {
                Some(artist) => format!("{artist} - {}", track.name),
                None => track.name.clone(),
            };
            TrackRef {
                input: track.url,
                title: Some(title),
            }
        })
        .collect())
}

/// Extract the quoted track title from a `Downloaded "Artist - Title"` line
fn parse_downloaded_title(stdout: &str) -> Option<String> {
    let line = stdout.lines().find(|line| line.contains("Downloaded"))?;
    let start = line.find('"')?;
    let end = line[start + 1..].find('"')?;
    let title = line[start + 1..start + 1 + end].trim();
    (!title.is_empty()).then(|| title.to_string())
}

#[async_trait]
impl DownloadEngine for SpotdlEngine {
    fn supports(&self, input: &str, kind: RequestKind) -> bool {
        kind == RequestKind::StreamingUrl && input::spotify_link(input).is_some()
    }

    async fn expand(&self, input: &str, _options: &FetchOptions) -> crate::Result<Vec<TrackRef>> {
        let save_file =
            std::env::temp_dir().join(format!("spotdl-{:08x}.spotdl", rand::random::<u32>()));
        debug!(input, save_file = %save_file.display(), "expanding collection via spotdl save");

        let command = Command::new(&self.binary_path)
            .arg("save")
            .arg(input)
            .arg("--save-file")
            .arg(&save_file)
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(SAVE_TIMEOUT, command).await {
            Ok(result) => result.map_err(|e| {
                crate::Error::Fetch(FetchError::EngineFailure {
                    engine: self.name().to_string(),
                    reason: format!("failed to execute {}: {e}", self.binary_path.display()),
                })
            })?,
            Err(_) => {
                return Err(crate::Error::Fetch(FetchError::NetworkTimeout {
                    input: input.to_string(),
                    timeout_secs: SAVE_TIMEOUT.as_secs(),
                }));
            }
        };

        if !output.status.success() {
            let _ = tokio::fs::remove_file(&save_file).await;
            return Err(crate::Error::Fetch(classify_failure(
                self.name(),
                input,
                SAVE_TIMEOUT.as_secs(),
                &output.stdout,
                &output.stderr,
            )));
        }

        let contents = tokio::fs::read_to_string(&save_file).await.map_err(|e| {
            crate::Error::Fetch(FetchError::EngineFailure {
                engine: self.name().to_string(),
                reason: format!("save file was not written: {e}"),
            })
        })?;
        let _ = tokio::fs::remove_file(&save_file).await;

        parse_save_file(&contents).map_err(|e| {
            crate::Error::Fetch(FetchError::EngineFailure {
                engine: self.name().to_string(),
                reason: format!("unreadable save file: {e}"),
            })
        })
    }

    async fn fetch(&self, input: &str, options: &FetchOptions) -> crate::Result<FetchedTrack> {
        let link = input::spotify_link(input).ok_or_else(|| {
            crate::Error::Fetch(FetchError::EngineFailure {
                engine: self.name().to_string(),
                reason: format!("not a Spotify URL: {input}"),
            })
        })?;
        if link.kind != SpotifyKind::Track {
            return Err(crate::Error::Fetch(FetchError::EngineFailure {
                engine: self.name().to_string(),
                reason: "collection URL reached fetch without expansion".to_string(),
            }));
        }

        let args = self.fetch_args(input, options);
        debug!(input, "fetching via spotdl");

        let command = Command::new(&self.binary_path)
            .args(&args)
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(DOWNLOAD_TIMEOUT, command).await {
            Ok(result) => result.map_err(|e| {
                crate::Error::Fetch(FetchError::EngineFailure {
                    engine: self.name().to_string(),
                    reason: format!("failed to execute {}: {e}", self.binary_path.display()),
                })
            })?,
            Err(_) => {
                return Err(crate::Error::Fetch(FetchError::NetworkTimeout {
                    input: input.to_string(),
                    timeout_secs: DOWNLOAD_TIMEOUT.as_secs(),
                }));
            }
        };

        let identifier = format!("spotify {}", link.id);
        let stdout = String::from_utf8_lossy(&output.stdout);

        if !output.status.success() {
            return Err(crate::Error::Fetch(classify_failure(
                self.name(),
                input,
                DOWNLOAD_TIMEOUT.as_secs(),
                &output.stdout,
                &output.stderr,
            )));
        }

        // spotdl exits 0 both when it downloads and when it skips a file
        // that already exists on disk
        if stdout.contains("Skipping") || stdout.to_lowercase().contains("already") {
            return Err(crate::Error::Fetch(FetchError::DuplicateSkip {
                identifier,
            }));
        }

        if stdout.contains("Downloaded") {
            return Ok(FetchedTrack {
                title: parse_downloaded_title(&stdout).unwrap_or_else(|| input.to_string()),
                identifier,
                artist: None,
                file: None,
            });
        }

        Err(crate::Error::Fetch(FetchError::EngineFailure {
            engine: self.name().to_string(),
            reason: "engine exited successfully but confirmed no download".to_string(),
        }))
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
        "spotdl"
    }
}
