//! CLI module for NetPulse
//!
//! Provides commands:
//! - `diagnose`: plan and run a stepwise network diagnosis
//! - `monitor`: follow a background packet capture until it finishes
//! - `tools`: list the diagnostic tool catalog

use crate::app::AppConfig;
use clap::{Parser, Subcommand};

pub mod diagnose;
pub mod monitor;
pub mod tools;

/// NetPulse network diagnosis CLI
#[derive(Parser, Debug)]
#[command(name = "netpulse")]
#[command(about = "Stepwise network diagnosis driven by a language model")]
#[command(version)]
pub struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Diagnose a network problem described in plain language
    Diagnose {
        /// Problem description, e.g. "websites load slowly"
        problem: String,
        /// Run every planned step with default parameters without prompting
        #[arg(long)]
        auto: bool,
    },
    /// Monitor a packet capture session until it finishes
    Monitor {
        /// Capture session id
        session_id: String,
        /// Capture target shown in the session record
        #[arg(long)]
        target: Option<String>,
        /// Capture mode shown in the session record
        #[arg(long)]
        mode: Option<String>,
    },
    /// List the diagnostic tools
    Tools,
}

/// Run the CLI command
pub async fn run(cli: Cli, config: AppConfig) -> anyhow::Result<()> {
    match cli.command {
        Some(Commands::Diagnose { problem, auto }) => diagnose::run(&config, &problem, auto).await,
        Some(Commands::Monitor {
            session_id,
            target,
            mode,
        }) => monitor::run(&config, &session_id, target, mode).await,
        Some(Commands::Tools) => tools::run(),
        None => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            cmd.print_help()?;
            println!();
            Ok(())
        }
    }
}
