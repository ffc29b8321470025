//! State threaded through every route handler

use crate::{Config, MusicDownloader};
use std::sync::Arc;

/// Handler state: the coordinator plus a snapshot of the configuration.
///
/// Cloning is two `Arc` bumps, so axum can hand each request its own copy.
#[derive(Clone)]
pub struct AppState {
    /// Coordinator the handlers dispatch work to
    pub downloader: Arc<MusicDownloader>,

    /// Startup configuration; settings changed at runtime live in the
    /// coordinator, not here
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(downloader: Arc<MusicDownloader>, config: Arc<Config>) -> Self {
        Self { downloader, config }
    }
}
