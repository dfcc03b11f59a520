//! NetPulse - Stepwise Network Diagnosis
//!
//! CLI entry point.

#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;
use tracing::{debug, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod app;
mod cli;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let cli = cli::Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "netpulse=info,netpulse_core=info,netpulse_tools=info,netpulse_llm=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if cli.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    if cli.command.is_some() {
        debug!("Starting NetPulse v{}", env!("CARGO_PKG_VERSION"));

        if !std::path::Path::new(".env").exists() {
            debug!(".env file not found, using config files and environment only");
        }
    }

    let config = match app::load_config() {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, "Falling back to built-in configuration");
            app::AppConfig::default()
        }
    };

    cli::run(cli, config).await
}
