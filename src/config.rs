//! Configuration types for music-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use utoipa::ToSchema;

/// Batch behavior configuration (directories, concurrency, timeouts)
///
/// How batches are dispatched and where their output lands.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct BatchConfig {
    /// Root directory for all batch output (default: "~/music_downloads")
    #[serde(default = "default_root_dir")]
    pub root_dir: PathBuf,

    /// Number of concurrent download workers (default: 4)
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Per-socket timeout passed to the download engines (default: 15 seconds)
    ///
    /// This bounds each network read, not the whole item: a slow but live
    /// transfer keeps going, a stalled one fails with a network timeout.
    #[serde(default = "default_socket_timeout", with = "duration_serde")]
    pub socket_timeout: Duration,

    /// Dedup archive file (None = "<root_dir>/downloaded.archive")
    #[serde(default)]
    pub archive_path: Option<PathBuf>,

    /// File extensions included when packaging a batch into a zip
    #[serde(default = "default_audio_extensions")]
    pub audio_extensions: Vec<String>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
            workers: default_workers(),
            socket_timeout: default_socket_timeout(),
            archive_path: None,
            audio_extensions: default_audio_extensions(),
        }
    }
}

/// Engine tuning knobs forwarded to the external download tools
///
/// These control how aggressively one item is fetched. Note that the worker
/// pool bounds concurrent *items*; with `concurrent_fragments > 1` the number
/// of simultaneous sockets is `workers × concurrent_fragments`.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct EngineConfig {
    /// Whole-download retries inside the engine (default: 3)
    #[serde(default = "default_engine_retries")]
    pub retries: u32,

    /// Per-fragment retries inside the engine (default: 3)
    #[serde(default = "default_engine_retries")]
    pub fragment_retries: u32,

    /// Fragments fetched in parallel for one item (default: 8)
    #[serde(default = "default_concurrent_fragments")]
    pub concurrent_fragments: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retries: default_engine_retries(),
            fragment_retries: default_engine_retries(),
            concurrent_fragments: default_concurrent_fragments(),
        }
    }
}

/// External tool paths (yt-dlp, spotdl, ffmpeg)
///
/// Where to find the binaries the coordinator delegates to.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ToolsConfig {
    /// Path to yt-dlp executable (auto-detected if None)
    #[serde(default)]
    pub ytdlp_path: Option<PathBuf>,

    /// Path to spotdl executable (auto-detected if None)
    #[serde(default)]
    pub spotdl_path: Option<PathBuf>,

    /// Path to ffmpeg executable (auto-detected if None)
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Fall back to a PATH lookup when no explicit path is set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: None,
            spotdl_path: None,
            ffmpeg_path: None,
            search_path: true,
        }
    }
}

/// Main configuration for MusicDownloader
///
/// Split into focused sub-configs:
/// - [`batch`](BatchConfig) — directories, worker count, timeouts
/// - [`engine`](EngineConfig) — retry and fragment tuning for the engines
/// - [`tools`](ToolsConfig) — external binary paths
///
/// Sub-configs are `#[serde(flatten)]`ed so the serialized form stays a
/// single flat object. The whole struct is read once at startup — from the
/// environment via [`Config::from_env`] or built directly — and is immutable
/// afterwards. Runtime-adjustable knobs live in
/// [`crate::types::UserSettings`] instead.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Batch behavior settings (directories, worker count, timeouts)
    #[serde(flatten)]
    pub batch: BatchConfig,

    /// Engine retry and fragment tuning
    #[serde(flatten)]
    pub engine: EngineConfig,

    /// External tool paths
    #[serde(flatten)]
    pub tools: ToolsConfig,

    /// Data storage and state management
    pub persistence: PersistenceConfig,

    /// API and external server integration
    #[serde(flatten)]
    pub server: ServerIntegrationConfig,
}

impl Config {
    /// Build a configuration from `MUSIC_DL_*` environment variables
    ///
    /// Recognized variables:
    ///
    /// | Variable           | Meaning                        | Default                        |
    /// |--------------------|--------------------------------|--------------------------------|
    /// | `MUSIC_DL_ROOT`    | Root output directory          | `~/music_downloads`            |
    /// | `MUSIC_DL_WORKERS` | Concurrent worker count        | `4`                            |
    /// | `MUSIC_DL_TIMEOUT` | Per-socket timeout (seconds)   | `15`                           |
    /// | `MUSIC_DL_ARCHIVE` | Dedup archive file             | `<root>/downloaded.archive`    |
    ///
    /// Variables are read exactly once here; later changes to the process
    /// environment have no effect. When `MUSIC_DL_ROOT` is set, the database
    /// also moves under it so a pure-env deployment keeps all state in one
    /// place.
    pub fn from_env() -> Result<Self> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Like [`Config::from_env`], but reads variables through the given lookup
    /// function. Exists so construction can be tested without mutating the
    /// process environment.
    pub fn from_env_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(root) = lookup("MUSIC_DL_ROOT") {
            config.batch.root_dir = PathBuf::from(root);
            config.persistence.database_path = config.batch.root_dir.join("music-dl.db");
        }

        if let Some(raw) = lookup("MUSIC_DL_WORKERS") {
            let workers: usize = raw.parse().map_err(|_| Error::Config {
                message: format!("'{raw}' is not a valid worker count"),
                key: Some("MUSIC_DL_WORKERS".to_string()),
            })?;
            if workers == 0 {
                return Err(Error::Config {
                    message: "worker count must be at least 1".to_string(),
                    key: Some("MUSIC_DL_WORKERS".to_string()),
                });
            }
            config.batch.workers = workers;
        }

        if let Some(raw) = lookup("MUSIC_DL_TIMEOUT") {
            let secs: u64 = raw.parse().map_err(|_| Error::Config {
                message: format!("'{raw}' is not a valid timeout in seconds"),
                key: Some("MUSIC_DL_TIMEOUT".to_string()),
            })?;
            if secs == 0 {
                return Err(Error::Config {
                    message: "timeout must be at least 1 second".to_string(),
                    key: Some("MUSIC_DL_TIMEOUT".to_string()),
                });
            }
            config.batch.socket_timeout = Duration::from_secs(secs);
        }

        if let Some(archive) = lookup("MUSIC_DL_ARCHIVE") {
            config.batch.archive_path = Some(PathBuf::from(archive));
        }

        Ok(config)
    }

    /// Root output directory
    pub fn root_dir(&self) -> &PathBuf {
        &self.batch.root_dir
    }

    /// Resolved dedup archive path (explicit override or `<root>/downloaded.archive`)
    pub fn archive_path(&self) -> PathBuf {
        self.batch
            .archive_path
            .clone()
            .unwrap_or_else(|| self.batch.root_dir.join("downloaded.archive"))
    }
}

/// Data storage and state management configuration
///
/// Groups settings related to persistence and session history.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PersistenceConfig {
    /// Database path (default: "./music-dl.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// Outward-facing server configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ServerIntegrationConfig {
    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:7860)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// When set, requests must present this key in `X-Api-Key`
    #[serde(default)]
    pub api_key: Option<String>,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins; `"*"` admits any (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Serve Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,

    /// Per-IP token-bucket rate limiting
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            api_key: None,
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

/// Knobs for the per-IP token buckets
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RateLimitConfig {
    /// Whether requests are limited at all (default: false)
    #[serde(default)]
    pub enabled: bool,

    /// Sustained refill rate per client IP (default: 100)
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,

    /// Bucket capacity, i.e. the largest tolerated burst (default: 200)
    #[serde(default = "default_burst_size")]
    pub burst_size: u32,

    /// Path prefixes never limited
    #[serde(default = "default_exempt_paths")]
    pub exempt_paths: Vec<String>,

    /// Client IPs never limited (default: localhost)
    #[serde(default = "default_exempt_ips")]
    pub exempt_ips: Vec<std::net::IpAddr>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            requests_per_second: 100,
            burst_size: 200,
            exempt_paths: default_exempt_paths(),
            exempt_ips: default_exempt_ips(),
        }
    }
}

// Default value functions
fn default_root_dir() -> PathBuf {
    #[allow(deprecated)] // un-deprecated in recent toolchains; attribute kept for older clippy
    std::env::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("music_downloads")
}

fn default_workers() -> usize {
    4
}

fn default_socket_timeout() -> Duration {
    Duration::from_secs(15)
}

fn default_audio_extensions() -> Vec<String> {
    vec!["mp3".into(), "m4a".into(), "opus".into(), "flac".into()]
}

fn default_engine_retries() -> u32 {
    3
}

fn default_concurrent_fragments() -> u32 {
    8
}

fn default_database_path() -> PathBuf {
    PathBuf::from("music-dl.db")
}

fn default_true() -> bool {
    true
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 7860))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".into()]
}

fn default_requests_per_second() -> u32 {
    100
}

fn default_burst_size() -> u32 {
    200
}

fn default_exempt_paths() -> Vec<String> {
    // SSE connections are long-lived and health probes must never 429
    vec!["/api/v1/events".to_string(), "/api/v1/health".to_string()]
}

fn default_exempt_ips() -> Vec<std::net::IpAddr> {
    use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
    vec![
        IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(Ipv6Addr::LOCALHOST),
    ]
}

// Durations travel as whole seconds in the flat config object
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
