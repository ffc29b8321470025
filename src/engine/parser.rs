//! Parser for download engine output
//!
//! The engines print a machine-readable track line on success (tab-separated,
//! emitted via yt-dlp's `--print`) and free-form diagnostics on failure. This
//! module turns both into typed results: a [`FetchedTrack`] or a categorized
//! [`FetchError`].

use super::traits::{FetchedTrack, TrackRef};
use crate::error::FetchError;
use std::path::PathBuf;
use std::str;

/// Output substrings that mark the media itself as gone
const UNAVAILABLE_MARKERS: [&str; 6] = [
    "unavailable",
    "private video",
    "removed",
    "not available",
    "404",
    "terminated",
];

/// Output substrings that mark a conversion failure
const CODEC_MARKERS: [&str; 4] = ["ffmpeg", "postprocess", "audio conversion", "encoder"];

/// Parse the track line an engine prints after a successful fetch
///
/// The line is tab-separated: `identifier \t title \t artist \t filepath`,
/// where identifier is `<provider> <media-id>`. Lines are scanned from the
/// bottom so progress output above the final report is ignored. Missing
/// fields come through as `NA` (yt-dlp's placeholder) and map to `None`.
pub fn parse_track_line(stdout: &[u8]) -> Option<FetchedTrack> {
    let output = str::from_utf8(stdout).unwrap_or_default();

    for line in output.lines().rev() {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != 4 {
            continue;
        }

        let identifier = fields[0].trim();
        // A valid identifier is "<provider> <id>"; anything else is noise
        let Some((provider, id)) = identifier.split_once(' ') else {
            continue;
        };
        if provider.is_empty() || id.is_empty() {
            continue;
        }

        let title = fields[1].trim();
        if title.is_empty() {
            continue;
        }

        return Some(FetchedTrack {
            identifier: format!("{} {}", provider.to_lowercase(), id),
            title: title.to_string(),
            artist: field_value(fields[2]),
            file: field_value(fields[3]).map(PathBuf::from),
        });
    }

    None
}

/// Parse `--flat-playlist` expansion output into ordered track references
///
/// Each entry line is `url \t title`. Malformed lines and entries without a
/// usable URL are skipped; order is preserved.
pub fn parse_expansion_output(stdout: &[u8]) -> Vec<TrackRef> {
    let output = str::from_utf8(stdout).unwrap_or_default();

    output
        .lines()
        .filter_map(|line| {
            let (url, title) = line.split_once('\t')?;
            let url = url.trim();
            if url.is_empty() || url == "NA" {
                return None;
            }
            Some(TrackRef {
                input: url.to_string(),
                title: field_value(title),
            })
        })
        .collect()
}

/// Parse a `--version` probe, returning the first non-empty line
pub fn parse_version(stdout: &[u8]) -> Option<String> {
    str::from_utf8(stdout)
        .ok()?
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(String::from)
}

/// Categorize a failed engine run from its combined output
///
/// Checks run from most to least specific: an "already downloaded" report
/// resolves as a duplicate skip, then timeouts, then markers that the media
/// itself is gone, then conversion failures. Anything else becomes an
/// unclassified engine failure carrying the trailing output line.
pub fn classify_failure(
    engine: &str,
    input: &str,
    timeout_secs: u64,
    stdout: &[u8],
    stderr: &[u8],
) -> FetchError {
    let stdout = str::from_utf8(stdout).unwrap_or_default();
    let stderr = str::from_utf8(stderr).unwrap_or_default();
    let combined = format!("{stdout}\n{stderr}");
    let lower = combined.to_lowercase();

    if lower.contains("already") {
        return FetchError::DuplicateSkip {
            identifier: input.trim().to_string(),
        };
    }

    if lower.contains("timed out") || lower.contains("timeout") {
        return FetchError::NetworkTimeout {
            input: input.to_string(),
            timeout_secs,
        };
    }

    if let Some(marker) = UNAVAILABLE_MARKERS.iter().find(|m| lower.contains(**m)) {
        return FetchError::UnavailableResource {
            input: input.to_string(),
            reason: matching_line(&combined, marker)
                .unwrap_or_else(|| format!("resource {marker}")),
        };
    }

    if let Some(marker) = CODEC_MARKERS.iter().find(|m| lower.contains(**m)) {
        return FetchError::CodecError {
            input: input.to_string(),
            reason: matching_line(&combined, marker)
                .unwrap_or_else(|| format!("{marker} failure")),
        };
    }

    FetchError::EngineFailure {
        engine: engine.to_string(),
        reason: last_line(&combined).unwrap_or_else(|| "exit status non-zero".to_string()),
    }
}

/// First line containing `marker` (case-insensitive), trimmed
fn matching_line(output: &str, marker: &str) -> Option<String> {
    output
        .lines()
        .find(|line| line.to_lowercase().contains(marker))
        .map(|line| line.trim().to_string())
}

/// Last non-empty line of the output, trimmed
fn last_line(output: &str) -> Option<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .next_back()
        .map(String::from)
}

/// Normalize an optional tab-separated field: empty and "NA" become None
fn field_value(field: &str) -> Option<String> {
    let field = field.trim();
    if field.is_empty() || field == "NA" {
        None
    } else {
        Some(field.to_string())
    }
}
