//! Line-keyed dedup archive
//!
//! The archive is a plain text file holding one identifier per line
//! (e.g. `youtube dQw4w9WgXcQ`). An identifier's presence means the track was
//! downloaded by some earlier batch and must not be fetched again. The file is
//! append-only during normal operation; [`DownloadArchive::clear`] is the only
//! operation that rewrites it.

use crate::error::{Error, Result};
use std::collections::HashSet;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// In-memory view of the persisted archive file
///
/// All mutation goes through one async mutex so a membership check and the
/// append that follows it are atomic: two workers finishing the same track
/// concurrently resolve to exactly one recorded entry.
#[derive(Debug)]
pub struct DownloadArchive {
    path: PathBuf,
    entries: Mutex<HashSet<String>>,
}

impl DownloadArchive {
    /// Load the archive from `path`
    ///
    /// A missing file is an empty archive; it is created on the first append.
    /// Lines are trimmed and blank lines ignored, so hand-edited files load
    /// cleanly.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let entries: HashSet<String> = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from)
                .collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashSet::new(),
            Err(e) => {
                return Err(Error::Archive {
                    message: format!("failed to read archive: {e}"),
                    path,
                });
            }
        };

        info!(
            path = %path.display(),
            entries = entries.len(),
            "loaded download archive"
        );

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Whether `identifier` is already recorded
    pub async fn contains(&self, identifier: &str) -> bool {
        self.entries.lock().await.contains(identifier.trim())
    }

    /// Number of recorded identifiers
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Whether the archive has no entries
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Sorted copy of all recorded identifiers
    pub async fn entries(&self) -> Vec<String> {
        let mut entries: Vec<String> = self.entries.lock().await.iter().cloned().collect();
        entries.sort();
        entries
    }

    /// Record `identifier`, appending it to the backing file
    ///
    /// Returns `Ok(true)` if the identifier was new and is now persisted, and
    /// `Ok(false)` if it was already present (the caller resolves that item as
    /// skipped). The membership check and the file append happen under the
    /// same lock; on a write error nothing is inserted, so a later attempt
    /// retries the append.
    pub async fn record(&self, identifier: &str) -> Result<bool> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(Error::Archive {
                message: "refusing to record an empty identifier".to_string(),
                path: self.path.clone(),
            });
        }

        let mut entries = self.entries.lock().await;
        if entries.contains(identifier) {
            debug!(identifier, "identifier already archived");
            return Ok(false);
        }

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::Archive {
                    message: format!("failed to create archive directory: {e}"),
                    path: self.path.clone(),
                })?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| Error::Archive {
                message: format!("failed to open archive for append: {e}"),
                path: self.path.clone(),
            })?;

        file.write_all(format!("{identifier}\n").as_bytes())
            .await
            .map_err(|e| Error::Archive {
                message: format!("failed to append identifier: {e}"),
                path: self.path.clone(),
            })?;
        file.flush().await.map_err(|e| Error::Archive {
            message: format!("failed to flush archive: {e}"),
            path: self.path.clone(),
        })?;

        entries.insert(identifier.to_string());
        debug!(identifier, "recorded identifier in archive");
        Ok(true)
    }

    /// Remove every entry and truncate the backing file
    ///
    /// Returns the number of identifiers removed.
    pub async fn clear(&self) -> Result<usize> {
        let mut entries = self.entries.lock().await;

        tokio::fs::write(&self.path, b"")
            .await
            .map_err(|e| Error::Archive {
                message: format!("failed to truncate archive: {e}"),
                path: self.path.clone(),
            })?;

        let removed = entries.len();
        entries.clear();
        info!(removed, "cleared download archive");
        Ok(removed)
    }
}
