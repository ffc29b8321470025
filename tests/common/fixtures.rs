//! Batch input fixtures and stub engine generators

use std::path::{Path, PathBuf};

/// Mixed batch text: URLs, a search query, a comment and blank lines
pub const MIXED_BATCH_INPUT: &str = "\
https://www.youtube.com/watch?v=stubAlpha01

# the next line is a short link
https://youtu.be/stubBravo02
artist name - song title
";

/// Batch text with no usable request lines
pub const EMPTY_BATCH_INPUT: &str = "# only a comment\n\n   \n";

/// Build batch text from individual request lines
pub fn create_batch_input(lines: &[&str]) -> String {
    let mut text = String::new();
    for line in lines {
        text.push_str(line);
        text.push('\n');
    }
    text
}

/// Build a YouTube watch URL carrying the given video ID
pub fn watch_url(id: &str) -> String {
    format!("https://www.youtube.com/watch?v={id}")
}

/// Stub engine script that mimics the yt-dlp CLI surface the crate drives
///
/// Behavior by invocation:
/// - `--version` prints a version line and exits 0
/// - a fetch writes one small `.mp3` into the `-o` template's directory and
///   prints the tab-separated track report on stdout
/// - targets containing `unavailable` fail with a "Video unavailable" line
/// - targets containing `slow` sleep one second before finishing, so stop
///   behavior can be observed mid-batch
///
/// The media ID is taken from the `v=` query parameter when present,
/// otherwise derived from the target text.
pub const STUB_ENGINE_SCRIPT: &str = r#"#!/bin/sh
if [ "$1" = "--version" ]; then
    echo "2025.08.20-stub"
    exit 0
fi

dest=""
prev=""
target=""
for arg in "$@"; do
    if [ "$prev" = "-o" ]; then
        dest=$(dirname "$arg")
    fi
    prev="$arg"
    target="$arg"
done

case "$target" in
    *v=*)
        id="${target##*v=}"
        id="${id%%&*}"
        ;;
    *)
        id=$(printf '%s' "$target" | tr -c 'a-zA-Z0-9' '_' | cut -c1-24)
        ;;
esac

case "$target" in
    *unavailable*)
        echo "ERROR: [stub] $id: Video unavailable" >&2
        exit 1
        ;;
esac

case "$target" in
    *slow*)
        sleep 1
        ;;
esac

mkdir -p "$dest"
file="$dest/Stub Track $id.mp3"
printf 'stub audio payload' > "$file"
printf 'youtube %s\tStub Track %s\tStub Artist\t%s\n' "$id" "$id" "$file"
"#;

/// Write the stub engine script into `dir` and make it executable
#[cfg(unix)]
pub fn write_stub_engine(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("stub-engine");
    std::fs::write(&path, STUB_ENGINE_SCRIPT).expect("Failed to write stub engine script");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .expect("Failed to mark stub engine executable");
    path
}

/// Write a stand-in encoder binary into `dir`
///
/// Startup only verifies the file exists; the stub engine never invokes it.
#[cfg(unix)]
pub fn write_stub_encoder(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("ffmpeg");
    std::fs::write(&path, "#!/bin/sh\nexit 0\n").expect("Failed to write stub encoder");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .expect("Failed to mark stub encoder executable");
    path
}
