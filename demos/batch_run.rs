//! Basic batch example
//!
//! This example demonstrates the core functionality of music-dl:
//! - Building a configuration
//! - Creating a coordinator instance
//! - Subscribing to events
//! - Submitting a batch of URLs and search queries
//! - Following it to the final tally
//!
//! Requires yt-dlp and ffmpeg in PATH.

use music_dl::config::BatchConfig;
use music_dl::{BatchOptions, Config, Event, MusicDownloader};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging (optional)
    // Uncomment if you add tracing-subscriber to your dependencies:
    // tracing_subscriber::fmt::init();

    // Build configuration
    let config = Config {
        batch: BatchConfig {
            root_dir: "downloads".into(),
            workers: 3,
            ..Default::default()
        },
        ..Default::default()
    };

    // Create coordinator instance
    let downloader = MusicDownloader::new(config).await?;

    // Subscribe before submitting so no event is missed
    let mut events = downloader.subscribe();

    // One request per line: URLs or free-text searches, comments allowed
    let batch = "\
# edit these lines to taste
https://www.youtube.com/watch?v=dQw4w9WgXcQ
daft punk harder better faster stronger
";

    let session = downloader
        .submit_batch(batch, BatchOptions::default())
        .await?;
    println!(
        "Submitted batch {} with {} item(s)",
        session.reference, session.stats.total
    );

    // Follow the batch to its terminal event
    while let Ok(event) = events.recv().await {
        match event {
            Event::ItemDispatched {
                position, input, ..
            } => {
                println!("⬇ #{}: {}", position + 1, input);
            }
            Event::ItemCompleted {
                position, title, ..
            } => {
                println!("✓ #{}: {}", position + 1, title);
            }
            Event::ItemSkipped {
                position, reason, ..
            } => {
                println!("⏭ #{}: skipped ({})", position + 1, reason);
            }
            Event::ItemFailed {
                position, error, ..
            } => {
                println!("✗ #{}: {}", position + 1, error);
            }
            Event::BatchCompleted { id, stats, zip_path } if id == session.id => {
                println!(
                    "Done: {} downloaded, {} skipped, {} failed",
                    stats.completed, stats.skipped, stats.failed
                );

                // Tally what actually landed on disk
                let disk_bytes: u64 = walkdir::WalkDir::new(&session.output_dir)
                    .into_iter()
                    .filter_map(|e| e.ok())
                    .filter(|e| e.file_type().is_file())
                    .filter_map(|e| e.metadata().ok())
                    .map(|m| m.len())
                    .sum();
                println!(
                    "{:.1} MB in {}",
                    disk_bytes as f64 / 1_000_000.0,
                    session.output_dir.display()
                );

                if let Some(zip) = zip_path {
                    println!("📦 Packaged: {}", zip.display());
                }
                break;
            }
            _ => {}
        }
    }

    downloader.shutdown().await?;
    Ok(())
}
