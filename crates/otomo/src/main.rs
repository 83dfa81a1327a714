// SPDX-FileCopyrightText: 2026 Otomo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Otomo - stream monitoring and chat relay engine.
//!
//! Binary entry point: loads configuration, wires the engine to its
//! Holodex and Discord adapters, and runs until a shutdown signal.

mod health;
mod shutdown;
mod telemetry;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use otomo_config::OtomoConfig;
use otomo_core::OtomoError;
use otomo_discord::DiscordNotifier;
use otomo_engine::Engine;
use otomo_holodex::HolodexClient;

use health::LogHealthSink;

/// Otomo - stream monitoring and chat relay engine.
#[derive(Parser, Debug)]
#[command(name = "otomo", version, about, long_about = None)]
struct Cli {
    /// Path to an explicit config file, bypassing the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the relay engine.
    Serve,
    /// Load and validate configuration, then exit.
    CheckConfig,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(errors) => {
            otomo_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.log.level);

    match cli.command {
        Some(Commands::CheckConfig) => {
            println!(
                "otomo: config ok (tracking interval {}s, store {})",
                config.upstream.poll_interval_secs, config.store.path
            );
        }
        Some(Commands::Serve) | None => {
            if let Err(err) = serve(config).await {
                eprintln!("otomo: {err}");
                std::process::exit(1);
            }
        }
    }
}

fn load_config(
    path: Option<&std::path::Path>,
) -> Result<OtomoConfig, Vec<otomo_config::ConfigError>> {
    match path {
        Some(path) => otomo_config::load_and_validate_path(path),
        None => otomo_config::load_and_validate(),
    }
}

fn init_tracing(level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn serve(config: OtomoConfig) -> Result<(), OtomoError> {
    telemetry::install_metrics(&config.metrics)?;
    let store = Arc::new(otomo_config::CommunityStore::open(&config.store.path)?);
    let upstream = Arc::new(HolodexClient::new(&config.upstream)?);
    let notifier = Arc::new(DiscordNotifier::new(&config.discord)?);
    let health = Arc::new(LogHealthSink);

    let shutdown = shutdown::install_signal_handler();
    info!("otomo starting");
    Engine::new(config, upstream, store, notifier, health)
        .run(shutdown)
        .await;
    info!("otomo stopped");
    Ok(())
}
