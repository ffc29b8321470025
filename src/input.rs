//! Batch input parsing and classification
//!
//! A batch arrives as free text: one request per line, where a line is either
//! a URL or a search query. Blank lines and `#`-comments are ignored. Requests
//! keep their submission order end to end.

use crate::types::RequestKind;
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

// Pattern literals are known-valid; a failure here is a programming error.
#[allow(clippy::expect_used)]
static SPOTIFY_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"open\.spotify\.com/(?:intl-[a-z]+/)?(track|album|playlist|artist)/([a-zA-Z0-9]+)")
        .expect("spotify link pattern is valid")
});

/// URL substrings that mark a multi-track page on non-streaming services
const PLAYLIST_TOKENS: [&str; 3] = ["list=", "playlist", "/sets/"];

/// What a Spotify URL points at
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpotifyKind {
    /// Single track
    Track,
    /// Full album
    Album,
    /// User or editorial playlist
    Playlist,
    /// Artist page (top tracks)
    Artist,
}

/// A recognized Spotify link
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpotifyLink {
    /// What the link points at
    pub kind: SpotifyKind,
    /// The base62 Spotify ID
    pub id: String,
}

/// Split batch text into usable request lines, preserving order
///
/// Lines are trimmed; empty lines and lines starting with `#` are dropped.
pub fn parse_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect()
}

/// Classify one request line
pub fn classify(input: &str) -> RequestKind {
    if !is_url(input) {
        return RequestKind::SearchQuery;
    }
    if spotify_link(input).is_some() {
        return RequestKind::StreamingUrl;
    }
    if is_playlist_url(input) {
        return RequestKind::PlaylistUrl;
    }
    RequestKind::MediaUrl
}

/// Whether the line is a URL rather than a search query
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Whether a URL references a multi-track page (playlist, set, mix)
pub fn is_playlist_url(url: &str) -> bool {
    let lower = url.to_lowercase();
    PLAYLIST_TOKENS.iter().any(|token| lower.contains(token))
}

/// Parse a Spotify URL into its kind and ID, if it is one
pub fn spotify_link(url: &str) -> Option<SpotifyLink> {
    let captures = SPOTIFY_LINK.captures(url)?;
    let kind = match &captures[1] {
        "track" => SpotifyKind::Track,
        "album" => SpotifyKind::Album,
        "playlist" => SpotifyKind::Playlist,
        "artist" => SpotifyKind::Artist,
        _ => return None,
    };
    Some(SpotifyLink {
        kind,
        id: captures[2].to_string(),
    })
}

/// Whether this request expands into multiple track requests before dispatch
pub fn needs_expansion(input: &str, kind: RequestKind) -> bool {
    match kind {
        RequestKind::PlaylistUrl => true,
        RequestKind::StreamingUrl => {
            spotify_link(input).is_some_and(|link| link.kind != SpotifyKind::Track)
        }
        RequestKind::MediaUrl | RequestKind::SearchQuery => false,
    }
}

/// Derive the archive identifier from a URL before any network work
///
/// Only single-media URLs with an extractable ID resolve here; search queries
/// and opaque URLs resolve after the fetch, from the engine's reported ID.
/// The identifier format matches the archive file: `<provider> <media-id>`.
pub fn resolve_identifier(input: &str) -> Option<String> {
    if let Some(link) = spotify_link(input) {
        return match link.kind {
            SpotifyKind::Track => Some(format!("spotify {}", link.id)),
            _ => None,
        };
    }
    youtube_video_id(input).map(|id| format!("youtube {id}"))
}

/// Extract the video ID from a YouTube watch or short-link URL
fn youtube_video_id(input: &str) -> Option<String> {
    let url = Url::parse(input).ok()?;
    let host = url.host_str()?;

    if host == "youtu.be" || host == "www.youtu.be" {
        let id = url.path_segments()?.next()?.to_string();
        return (!id.is_empty()).then_some(id);
    }

    if host.ends_with("youtube.com") && url.path() == "/watch" {
        let id = url
            .query_pairs()
            .find(|(key, _)| key == "v")
            .map(|(_, value)| value.into_owned())?;
        return (!id.is_empty()).then_some(id);
    }

    None
}
