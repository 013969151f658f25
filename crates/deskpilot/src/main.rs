// SPDX-FileCopyrightText: 2026 Deskpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deskpilot - an AI-augmented customer support dispatcher.
//!
//! Binary entry point: parses the CLI, loads configuration, initialises
//! logging, and runs the selected command.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod serve;

/// Deskpilot - an AI-augmented customer support dispatcher.
#[derive(Parser, Debug)]
#[command(name = "deskpilot", version, about, long_about = None)]
struct Cli {
    /// Path to a config file (defaults to the XDG hierarchy).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the dispatcher: webhook gateway plus orchestration engine.
    Serve,
    /// Print session counts from the store and exit.
    Status,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => deskpilot_config::load_config_from_path(path),
        None => deskpilot_config::load_config(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            std::process::exit(2);
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.service.log_level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let result = match cli.command {
        Commands::Serve => serve::run(config).await,
        Commands::Status => status(config).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn status(
    config: deskpilot_config::DeskpilotConfig,
) -> Result<(), deskpilot_core::DeskpilotError> {
    let store = deskpilot_storage::SessionStore::open(&config.storage.database_path).await?;
    let counts = store.stats().await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&counts)
            .map_err(|e| deskpilot_core::DeskpilotError::Internal(e.to_string()))?
    );
    store.close().await
}
