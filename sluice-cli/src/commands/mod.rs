//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod assets;
mod check;
mod replay;

use anyhow::Result;
use clap::Subcommand;
use sluice_bridge::{HttpOrchestrationGraph, InMemoryGraph, OrchestrationGraph};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Validate pipeline definitions
    Check {
        /// Pipeline JSON files
        #[arg(required = true)]
        pipelines: Vec<PathBuf>,
    },
    /// Show the assets declared by pipeline definitions
    Assets {
        /// Pipeline JSON files
        #[arg(required = true)]
        pipelines: Vec<PathBuf>,

        /// Declare the assets in the orchestration graph
        #[arg(long)]
        register: bool,
    },
    /// Replay a recorded run through the bridge and record its materializations
    Replay {
        /// Pipeline JSON file
        #[arg(short, long)]
        pipeline: PathBuf,

        /// Newline-delimited JSON run events
        #[arg(short, long)]
        events: PathBuf,

        /// Only run these assets (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        select: Vec<String>,

        /// Correlation id for logs and records, generated when omitted
        #[arg(long)]
        correlation_id: Option<String>,

        /// Pause between replayed events, in milliseconds
        #[arg(long, default_value = "0")]
        delay_ms: u64,
    },
}

/// Handle a CLI command
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Check { pipelines } => check::handle_check(&pipelines, config),
        Commands::Assets {
            pipelines,
            register,
        } => assets::handle_assets(&pipelines, register, config).await,
        Commands::Replay {
            pipeline,
            events,
            select,
            correlation_id,
            delay_ms,
        } => {
            let args = replay::ReplayArgs {
                pipeline,
                events,
                select,
                correlation_id,
                delay_ms,
            };
            replay::handle_replay(args, config).await
        }
    }
}

/// Graph selected by the configuration
fn graph(config: &Config) -> Arc<dyn OrchestrationGraph> {
    match &config.bridge.orchestrator_url {
        Some(url) => Arc::new(HttpOrchestrationGraph::new(url.clone())),
        None => Arc::new(InMemoryGraph::new()),
    }
}
