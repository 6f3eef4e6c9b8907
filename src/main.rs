use anyhow::Result;
use clap::Parser;
use tracing::{debug, Level};

mod cli;
mod config;
mod core;
mod error;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; verbosity count maps to the max level unless
    // RUST_LOG overrides it
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!("Starting simwatch v{}", env!("CARGO_PKG_VERSION"));

    cli.execute().await
}
