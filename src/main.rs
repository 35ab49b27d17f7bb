//! Command line entry point for catalog-mirror

use std::path::PathBuf;

use catalog_mirror::{CatalogMirror, Config};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Mirror a product catalog and its images
#[derive(Debug, Parser)]
#[command(name = "catalog-mirror", version, about)]
struct Cli {
    /// JSON configuration file (defaults apply when omitted)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Stage to run (default: all)
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum Command {
    /// Page through the catalog and record every product
    Enumerate,
    /// Resolve image lists and download missing images
    SyncImages,
    /// Enumerate, then sync images
    All,
}

/// Initialize tracing subscriber with optional JSON formatting
fn init_tracing() {
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("catalog_mirror=info"));

    if json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn run(cli: Cli) -> catalog_mirror::Result<()> {
    let config = match &cli.config {
        Some(path) => Config::from_json_file(path)?,
        None => Config::default(),
    };

    let mirror = CatalogMirror::new(config).await?;

    let result = match cli.command.unwrap_or(Command::All) {
        Command::Enumerate => mirror.enumerate_catalog().await.map(|_| ()),
        Command::SyncImages => mirror.sync_images().await.map(|_| ()),
        Command::All => mirror.run().await.map(|_| ()),
    };

    // Release the store whether or not the stage succeeded
    mirror.close().await;
    result
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    info!(started_at = %chrono::Utc::now().to_rfc3339(), "catalog mirror started");

    let result = run(cli).await;

    if let Err(e) = &result {
        error!(kind = %e.kind(), fatal = e.is_fatal(), "run aborted: {}", e);
    }

    info!(finished_at = %chrono::Utc::now().to_rfc3339(), "catalog mirror terminated");

    if result.is_err() {
        std::process::exit(1);
    }
}
