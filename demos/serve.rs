//! REST API server example
//!
//! This example shows how to run music-dl with the REST API enabled,
//! allowing control via HTTP endpoints.
//!
//! After starting, you can:
//! - View Swagger UI at http://localhost:7860/swagger-ui
//! - Submit batches via POST http://localhost:7860/batches
//! - Monitor batches via GET http://localhost:7860/batches
//! - Stream events via GET http://localhost:7860/events

use music_dl::MusicDownloader;
use music_dl::api::start_api_server;
use music_dl::config::{ApiConfig, BatchConfig, Config, ServerIntegrationConfig};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing (optional)
    // Uncomment if you add tracing-subscriber to your dependencies:
    // tracing_subscriber::fmt::init();

    // Configure API
    let api_config = ApiConfig {
        bind_address: "127.0.0.1:7860".parse::<SocketAddr>()?,
        api_key: None, // No authentication for local use
        cors_enabled: true,
        cors_origins: vec!["*".to_string()],
        swagger_ui: true,
        ..Default::default()
    };

    // Build configuration
    let config = Config {
        batch: BatchConfig {
            root_dir: "downloads".into(),
            ..Default::default()
        },
        server: ServerIntegrationConfig { api: api_config },
        ..Default::default()
    };

    // Create coordinator instance
    let downloader = Arc::new(MusicDownloader::new(config.clone()).await?);
    let config_arc = Arc::new(config);

    println!("🚀 Starting music-dl REST API server");
    println!("📖 Swagger UI: http://localhost:7860/swagger-ui");
    println!("🔄 Events stream: http://localhost:7860/events");
    println!();
    println!("Example commands:");
    println!("  # Submit a batch (one request per line)");
    println!("  curl -X POST http://localhost:7860/batches \\");
    println!("    -H 'Content-Type: application/json' \\");
    println!(
        "    -d '{{\"input\": \"https://www.youtube.com/watch?v=dQw4w9WgXcQ\\nnever gonna give you up\"}}'"
    );
    println!();
    println!("  # List batches");
    println!("  curl http://localhost:7860/batches");
    println!();
    println!("  # Inspect the dedup archive");
    println!("  curl http://localhost:7860/archive");
    println!();
    println!("  # Stream events (Server-Sent Events)");
    println!("  curl -N http://localhost:7860/events");

    // Start the API server (runs indefinitely)
    start_api_server(downloader, config_arc).await?;

    Ok(())
}
