//! Batch submission and request expansion.

use crate::db::NewSession;
use crate::engine::FetchOptions;
use crate::error::{BatchError, Error, Result};
use crate::input;
use crate::types::{BatchOptions, BatchStats, DownloadRequest, Quality, SessionInfo};
use chrono::TimeZone;
use std::path::PathBuf;

use super::MusicDownloader;
use super::runner::{self, RunnerContext};

impl MusicDownloader {
    /// Submit a batch of download requests
    ///
    /// Parses the raw multi-line input (blank lines and `#` comments are
    /// dropped), classifies each line, records the session, and spawns the
    /// batch runner. Returns immediately with the running session; playlist
    /// expansion and downloading happen in the background.
    ///
    /// # Errors
    ///
    /// - [`BatchError::NoInput`] if no usable line remains after parsing
    /// - [`Error::ShuttingDown`] if the coordinator no longer accepts batches
    pub async fn submit_batch(&self, input: &str, options: BatchOptions) -> Result<SessionInfo> {
        if !self
            .worker_state
            .accepting_new
            .load(std::sync::atomic::Ordering::SeqCst)
        {
            return Err(Error::ShuttingDown);
        }

        let lines = input::parse_lines(input);
        if lines.is_empty() {
            return Err(Error::Batch(BatchError::NoInput));
        }

        let requests: Vec<DownloadRequest> = lines
            .into_iter()
            .enumerate()
            .map(|(position, line)| {
                let kind = input::classify(&line);
                DownloadRequest {
                    position,
                    input: line,
                    kind,
                    title: None,
                }
            })
            .collect();

        // Per-batch options fall back to the persisted user settings
        let settings = self.db.load_settings().await?;
        let quality = options.quality.unwrap_or(settings.default_quality);
        let embed_thumbnail = options
            .embed_thumbnail
            .unwrap_or(settings.embed_thumbnail);

        let reference = format!("{:08x}", rand::random::<u32>());
        let dir_name = chrono::Local::now()
            .format("batch_%Y%m%d_%H%M%S")
            .to_string();
        let output_dir = self.config.root_dir().join(dir_name);
        tokio::fs::create_dir_all(&output_dir).await?;

        let started_at = chrono::Utc::now().timestamp();
        let id = self
            .db
            .insert_session(&NewSession {
                reference: reference.clone(),
                output_dir: output_dir.display().to_string(),
                total: requests.len() as i64,
                started_at,
            })
            .await?;

        let cancel_token = tokio_util::sync::CancellationToken::new();
        {
            let mut active = self.worker_state.active_batches.lock().await;
            active.insert(id, cancel_token.clone());
        }

        tracing::info!(
            batch_id = id.get(),
            reference = %reference,
            total = requests.len(),
            quality = quality.kbps(),
            "Batch submitted"
        );

        let total = requests.len();
        let ctx = RunnerContext {
            downloader: self.clone(),
            id,
            reference: reference.clone(),
            requests,
            fetch_options: self.build_fetch_options(output_dir.clone(), quality, embed_thumbnail),
            cancel_token,
            auto_zip: settings.auto_zip,
            max_history: settings.max_history,
        };
        tokio::spawn(async move { runner::run_batch(ctx).await });

        Ok(SessionInfo {
            id,
            reference,
            started_at: chrono::Utc
                .timestamp_opt(started_at, 0)
                .single()
                .unwrap_or_else(chrono::Utc::now),
            finished_at: None,
            output_dir,
            zip_path: None,
            stats: BatchStats {
                total,
                completed: 0,
                skipped: 0,
                failed: 0,
            },
            running: true,
        })
    }

    /// Assemble per-item fetch options from the config and resolved batch options
    pub(crate) fn build_fetch_options(
        &self,
        dest_dir: PathBuf,
        quality: Quality,
        embed_thumbnail: bool,
    ) -> FetchOptions {
        FetchOptions {
            dest_dir,
            quality,
            embed_thumbnail,
            socket_timeout: self.config.batch.socket_timeout,
            retries: self.config.engine.retries,
            fragment_retries: self.config.engine.fragment_retries,
            concurrent_fragments: self.config.engine.concurrent_fragments,
            ffmpeg_location: self.config.tools.ffmpeg_path.clone(),
        }
    }

    /// Expand playlist and collection URLs into their member tracks
    ///
    /// Expansion never downloads media; it asks the engine for a flat track
    /// listing. A request whose expansion fails (or yields nothing) is kept
    /// as a single opaque request and left to the fetch stage.
    pub(crate) async fn expand_requests(
        &self,
        requests: Vec<DownloadRequest>,
        options: &FetchOptions,
    ) -> Vec<DownloadRequest> {
        let mut expanded = Vec::with_capacity(requests.len());

        for request in requests {
            if !input::needs_expansion(&request.input, request.kind) {
                expanded.push(request);
                continue;
            }

            let Some(engine) = self.engine_for(&request.input, request.kind) else {
                expanded.push(request);
                continue;
            };

            match engine.expand(&request.input, options).await {
                Ok(tracks) if !tracks.is_empty() => {
                    self.log_line(
                        "INFO",
                        format!("expanded {} into {} tracks", request.input, tracks.len()),
                    );
                    expanded.extend(tracks.into_iter().map(|track| DownloadRequest {
                        position: 0, // re-numbered below
                        kind: input::classify(&track.input),
                        input: track.input,
                        title: track.title,
                    }));
                }
                Ok(_) => {
                    self.log_line(
                        "WARN",
                        format!("expansion of {} returned no tracks", request.input),
                    );
                    expanded.push(request);
                }
                Err(e) => {
                    tracing::warn!(input = %request.input, error = %e, "Expansion failed");
                    self.log_line(
                        "WARN",
                        format!("could not expand {}; treating as single item", request.input),
                    );
                    expanded.push(request);
                }
            }
        }

        for (position, request) in expanded.iter_mut().enumerate() {
            request.position = position;
        }

        expanded
    }
}
