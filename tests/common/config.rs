//! Test configuration helpers for creating stub-backed and live downloaders

use music_dl::config::{BatchConfig, PersistenceConfig, ToolsConfig};
use music_dl::{Config, MusicDownloader};
use std::sync::Arc;
use tempfile::TempDir;

/// Minimal error for the downloader constructors below
#[derive(Debug)]
pub struct ConfigError(pub String);

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "test setup failed: {}", self.0)
    }
}

impl std::error::Error for ConfigError {}

/// Create a MusicDownloader wired to the stub engine script
///
/// The stub fakes the external tool surface, so the full pipeline (dispatch,
/// subprocess invocation, output parsing, archive, packaging) runs without
/// network access. Keep the returned temp dir alive for the test duration.
#[cfg(unix)]
pub async fn create_stub_downloader() -> Result<(Arc<MusicDownloader>, TempDir), ConfigError> {
    create_stub_downloader_with_workers(2).await
}

/// Like [`create_stub_downloader`] with an explicit worker pool size
#[cfg(unix)]
pub async fn create_stub_downloader_with_workers(
    workers: usize,
) -> Result<(Arc<MusicDownloader>, TempDir), ConfigError> {
    let temp_dir = tempfile::tempdir()
        .map_err(|e| ConfigError(format!("Failed to create temp dir: {}", e)))?;

    let config = stub_config(temp_dir.path(), workers);
    let downloader = MusicDownloader::new(config)
        .await
        .map_err(|e| ConfigError(format!("Failed to create downloader: {}", e)))?;

    Ok((Arc::new(downloader), temp_dir))
}

/// Build a stub-engine configuration rooted at `dir`
///
/// Writes the stub scripts into `dir` (overwriting any previous copy), so
/// calling this twice with the same directory reopens the same state -
/// useful for restart tests.
#[cfg(unix)]
pub fn stub_config(dir: &std::path::Path, workers: usize) -> Config {
    let engine_path = super::fixtures::write_stub_engine(dir);
    let encoder_path = super::fixtures::write_stub_encoder(dir);

    Config {
        batch: BatchConfig {
            root_dir: dir.join("music"),
            workers,
            ..Default::default()
        },
        tools: ToolsConfig {
            ytdlp_path: Some(engine_path),
            spotdl_path: None,
            ffmpeg_path: Some(encoder_path),
            search_path: false,
        },
        persistence: PersistenceConfig {
            database_path: dir.join("test.db"),
        },
        ..Default::default()
    }
}

/// Create a MusicDownloader that discovers real tools in PATH
///
/// Used by the live E2E tests; requires yt-dlp and ffmpeg to be installed.
pub async fn create_live_downloader() -> Result<(Arc<MusicDownloader>, TempDir), ConfigError> {
    let temp_dir = tempfile::tempdir()
        .map_err(|e| ConfigError(format!("Failed to create temp dir: {}", e)))?;

    let config = Config {
        batch: BatchConfig {
            root_dir: temp_dir.path().join("music"),
            workers: 2,
            ..Default::default()
        },
        persistence: PersistenceConfig {
            database_path: temp_dir.path().join("test.db"),
        },
        ..Default::default()
    };

    let downloader = MusicDownloader::new(config)
        .await
        .map_err(|e| ConfigError(format!("Failed to create downloader: {}", e)))?;

    Ok((Arc::new(downloader), temp_dir))
}

/// Check if the live tool binaries are available in PATH
pub fn has_live_tools() -> bool {
    which::which("yt-dlp").is_ok() && which::which("ffmpeg").is_ok()
}

/// Known-downloadable URL for live tests, from `MUSIC_DL_TEST_URL` in .env
pub fn live_test_url() -> Option<String> {
    dotenvy::dotenv().ok();
    std::env::var("MUSIC_DL_TEST_URL").ok()
}

/// Search query for live tests, from `MUSIC_DL_TEST_QUERY` in .env
pub fn live_test_query() -> String {
    dotenvy::dotenv().ok();
    std::env::var("MUSIC_DL_TEST_QUERY")
        .unwrap_or_else(|_| "rick astley never gonna give you up".to_string())
}

/// Skip test if the live tool binaries are not available
#[macro_export]
macro_rules! skip_if_no_tools {
    () => {
        if !$crate::common::has_live_tools() {
            eprintln!("Skipping test: yt-dlp/ffmpeg not found in PATH");
            return;
        }
    };
}
