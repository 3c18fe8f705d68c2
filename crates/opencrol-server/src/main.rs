//! OpenCtrol agent host
//!
//! Drives a [`Coordinator`] from the command line: polls the agent, prints
//! snapshots and forwards commands.

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use opencrol_config::{OpenCtrolConfig, DEFAULT_CONFIG_FILE};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "opencrol")]
#[command(about = "Monitor and control an OpenCtrol remote agent", version)]
struct Args {
    /// Configuration file; secrets.yaml is read from the same directory
    #[arg(long, short, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Poll the agent until Ctrl-C, logging every snapshot
    Run,
    /// Refresh once and print the snapshot as JSON
    Status,
    /// Check connectivity and authentication
    Probe,
    /// Refresh once, then send a command
    Send {
        /// Command name, e.g. type_text or set_volume
        name: String,

        /// Command arguments as a JSON object
        #[arg(long)]
        args: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr so JSON output stays clean
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let config = OpenCtrolConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;

    match args.command {
        Command::Run => commands::run(&config).await,
        Command::Status => commands::status(&config).await,
        Command::Probe => commands::probe(&config).await,
        Command::Send { name, args } => {
            let args = match args {
                Some(raw) => serde_json::from_str(&raw)
                    .with_context(|| format!("parsing --args for {}", name))?,
                None => serde_json::Value::Null,
            };
            commands::send(&config, &name, args).await
        }
    }
}
