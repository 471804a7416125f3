//! Sluice CLI
//!
//! Validates pipeline definitions, lists the assets they declare and replays
//! recorded runs through the bridge.

mod commands;
mod config;
mod loader;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "sluice")]
#[command(about = "Expose pipeline resources as orchestration assets", long_about = None)]
struct Cli {
    /// Orchestration graph URL; materializations stay in memory when unset
    #[arg(long, env = "SLUICE_ORCHESTRATOR_URL", global = true)]
    orchestrator_url: Option<String>,

    /// Name assets `<pipeline>__<resource>`
    #[arg(long, global = true)]
    prefix_assets: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sluice=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = Config::load(cli.orchestrator_url, cli.prefix_assets)?;

    handle_command(cli.command, &config).await
}
