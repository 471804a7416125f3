//! Replay command handler
//!
//! Re-drives a recorded event log through the coordinator and the emitter,
//! exactly as a live run would be handled.

use anyhow::{Context, Result};
use colored::*;
use sluice_bridge::{
    CancellationToken, Definitions, EnvSecretsResolver, MaterializationEmitter, ReplayEngine,
    RunCoordinator, TriggerContext,
};
use sluice_bridge::translator::ROW_COUNT;
use sluice_core::domain::outcome::{ResourceStatus, RunOutcome, RunStatus};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::config::Config;
use crate::loader::read_pipeline;

/// Arguments of `sluice replay`
pub struct ReplayArgs {
    pub pipeline: PathBuf,
    pub events: PathBuf,
    pub select: Vec<String>,
    pub correlation_id: Option<String>,
    pub delay_ms: u64,
}

/// Replay a recorded run and print its outcome
pub async fn handle_replay(args: ReplayArgs, config: &Config) -> Result<()> {
    let translator = Arc::new(config.bridge.translator());

    let pipeline = read_pipeline(&args.pipeline)?;
    let name = pipeline.name.clone();
    let mut definitions = Definitions::new(translator.clone());
    definitions
        .add_pipeline(pipeline)
        .with_context(|| format!("Invalid pipeline in {}", args.pipeline.display()))?;

    let log = std::fs::read_to_string(&args.events)
        .with_context(|| format!("Failed to read event log: {}", args.events.display()))?;
    let engine = ReplayEngine::from_json_lines(&log)?
        .with_delay(Duration::from_millis(args.delay_ms))
        .with_capacity(config.bridge.event_buffer);

    let coordinator = RunCoordinator::new(
        Arc::new(engine),
        Arc::new(EnvSecretsResolver::with_prefix(
            config.bridge.secret_prefix.clone(),
        )),
        translator,
    )
    .with_policy(config.bridge.concurrency_policy);

    let graph = super::graph(config);
    definitions
        .register(graph.as_ref())
        .await
        .context("Failed to declare assets before the run")?;

    let mut trigger = match args.correlation_id {
        Some(id) => TriggerContext::new(id),
        None => TriggerContext::default(),
    };
    if !args.select.is_empty() {
        trigger = trigger.with_selection(args.select);
    }

    // Ctrl-C cancels the run instead of killing the process mid-emit
    let cancellation = CancellationToken::new();
    trigger = trigger.with_cancellation(cancellation.clone());
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling run");
            cancellation.cancel();
        }
    });

    let Some(pipeline) = definitions.pipeline(&name) else {
        anyhow::bail!("pipeline '{}' was not registered", name);
    };
    let outcome = coordinator.execute(pipeline, trigger).await;

    let specs = definitions
        .specs_for(&name)
        .context("asset specs missing for replayed pipeline")?;
    let emitter = MaterializationEmitter::new(graph);
    let records = emitter.emit(&outcome, specs).await?;

    print_outcome(&outcome, records.len());

    if outcome.status == RunStatus::Failed {
        anyhow::bail!("run {} failed", outcome.run_id);
    }
    Ok(())
}

fn print_outcome(outcome: &RunOutcome, recorded: usize) {
    let status = match outcome.status {
        RunStatus::Success => "SUCCESS".green().bold(),
        RunStatus::Failed => "FAILED".red().bold(),
    };

    println!("{} {}", "Run".bold(), outcome.run_id.to_string().cyan());
    println!("  Pipeline:    {}", outcome.pipeline.bold());
    println!("  Correlation: {}", outcome.correlation_id.dimmed());
    println!("  Status:      {}", status);
    if let Some(error) = &outcome.error {
        println!("  Error:       {}", error.to_string().red());
    }
    let elapsed = outcome.finished_at - outcome.started_at;
    println!("  Duration:    {}ms", elapsed.num_milliseconds());
    println!("  Recorded:    {} materialization(s)", recorded);
    println!();

    for result in &outcome.resources {
        let marker = match result.status {
            ResourceStatus::Success => "✓".green(),
            ResourceStatus::Failed => "✗".red(),
            ResourceStatus::Incomplete => "…".yellow(),
        };
        let rows = result
            .metadata
            .get(ROW_COUNT)
            .map(|rows| format!("{} rows", rows))
            .unwrap_or_default();
        println!("  {} {} {}", marker, result.resource.bold(), rows.dimmed());
        if let Some(error) = &result.error {
            println!("      {}", error.red());
        }
    }
}
