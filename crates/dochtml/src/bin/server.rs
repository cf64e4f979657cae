//! Conversion server binary
//!
//! Run with: cargo run -p dochtml --bin dochtml-server

use dochtml::{config::AppConfig, server::DocServer};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dochtml=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!(
        r#"
╔═══════════════════════════════════════════════════════════╗
║                   dochtml Conversion API                  ║
║         PDF / DOC / DOCX to HTML and plain text           ║
╚═══════════════════════════════════════════════════════════╝
"#
    );

    // Load configuration
    let config_path = std::env::var_os("DOCHTML_CONFIG").map(PathBuf::from);
    let config = AppConfig::load(config_path.as_deref())?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Uploads: {}", config.storage.upload_root.display());
    tracing::info!("  - Outputs: {}", config.storage.output_root.display());
    tracing::info!("  - Max upload: {} bytes", config.server.max_upload_size);
    tracing::info!("  - Job TTL: {}s", config.jobs.ttl_secs);

    // Create and start server
    let server = DocServer::new(config)?;

    println!("\nServer starting...");
    println!("  API: http://{}/api", server.address());
    println!("  Health: http://{}/api/health", server.address());
    println!("\nEndpoints:");
    println!("  POST   /api/upload                        - Upload documents");
    println!("  GET    /api/status/:job_id                - Job progress");
    println!("  GET    /api/download/:job_id/:filename    - Download HTML");
    println!("  GET    /api/preview/:job_id/:filename     - Preview HTML");
    println!("  GET    /api/extract_text/:job_id/:filename - Extract text");
    println!("  POST   /api/batch_extract_text/:job_id    - Extract text of every upload");
    println!("  GET    /api/download-batch/:job_id        - Download zip");
    println!("  POST   /convert                           - Convert and wait for results");
    println!("  DELETE /api/cleanup/:job_id               - Remove job");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
