//! Batch directory packaging
//!
//! After a batch finishes with at least one success, the batch directory is
//! packaged into a sibling zip (`batch_YYYYmmdd_HHMMSS.zip`) holding only
//! the recognized audio files, flat, deflate-compressed at the fastest
//! level. The zip is written on the blocking pool; download workers are
//! never stalled by compression.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Package the audio files of a batch directory into a sibling zip
///
/// Only files whose extension (case-insensitive) matches `extensions` are
/// included; logs, temp files and subdirectories are left out. Returns the
/// path of the created zip.
///
/// # Errors
///
/// Fails if the directory cannot be read, no audio file is present, or the
/// zip cannot be written.
pub(crate) async fn package_batch_dir(dir: &Path, extensions: &[String]) -> Result<PathBuf> {
    let dir = dir.to_path_buf();
    let extensions = extensions.to_vec();
    tokio::task::spawn_blocking(move || write_zip(&dir, &extensions))
        .await
        .map_err(|e| Error::Other(format!("packaging task failed: {e}")))?
}

fn write_zip(dir: &Path, extensions: &[String]) -> Result<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_audio_file(path, extensions))
        .collect();
    files.sort();

    if files.is_empty() {
        return Err(Error::Other(format!(
            "no audio files to package in {}",
            dir.display()
        )));
    }

    let zip_path = PathBuf::from(format!("{}.zip", dir.display()));
    let file = std::fs::File::create(&zip_path)?;
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::FileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .compression_level(Some(1));

    for path in &files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::Other(format!("unnameable file {}", path.display())))?;
        zip.start_file(&name, options)
            .map_err(|e| Error::Other(format!("zip start file failed ({name}): {e}")))?;
        let mut source = std::fs::File::open(path)?;
        std::io::copy(&mut source, &mut zip)?;
    }

    let mut inner = zip
        .finish()
        .map_err(|e| Error::Other(format!("zip finish failed: {e}")))?;
    inner.flush()?;

    Ok(zip_path)
}

fn is_audio_file(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            extensions
                .iter()
                .any(|wanted| wanted.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}
