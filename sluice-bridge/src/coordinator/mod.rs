//! Run coordinator
//!
//! Executes a pipeline once per trigger and maps the engine's single event
//! stream back onto per-resource results:
//! - Serializes runs per pipeline name through an `InFlightTable`
//! - Resolves secrets before the engine starts
//! - Consumes events strictly in order, checking the started -> terminal contract
//! - Races every wait against the trigger's cancellation token
//!
//! The coordinator never retries and keeps nothing between runs. Retry and
//! timeout policy belong to the orchestrator that calls `execute`.

mod demux;
mod in_flight;

pub use in_flight::{InFlightGuard, InFlightTable};

use sluice_core::domain::outcome::{ResourceStatus, RunError, RunOutcome, RunStatus};
use sluice_core::domain::pipeline::PipelineDescriptor;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::engine::PipelineEngine;
use crate::error::SecretsError;
use crate::index::ResourceIndex;
use crate::secrets::SecretsResolver;
use crate::translator::Translator;
use demux::{Flow, RunLedger};

/// What `execute` does when the pipeline already has a run in flight
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConcurrencyPolicy {
    /// Return immediately with `RunError::ConcurrentRunRejected`; the engine
    /// is not invoked and the trigger source may retry later
    #[default]
    Reject,
    /// Wait until the in-flight run finishes, then run; the wait honours
    /// the trigger's cancellation token
    Queue,
}

/// Per-trigger input from the orchestrator
#[derive(Debug, Clone)]
pub struct TriggerContext {
    /// Identifier carried through logs and materialization records
    pub correlation_id: String,
    /// Cancelling this token stops the run promptly
    pub cancellation: CancellationToken,
    /// Asset names to run; `None` runs every resource
    pub selection: Option<BTreeSet<String>>,
}

impl TriggerContext {
    pub fn new(correlation_id: impl Into<String>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            cancellation: CancellationToken::new(),
            selection: None,
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Restricts the run to the given assets
    pub fn with_selection<I, S>(mut self, assets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selection = Some(assets.into_iter().map(Into::into).collect());
        self
    }
}

impl Default for TriggerContext {
    fn default() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }
}

/// Executes pipelines on behalf of the orchestrator
pub struct RunCoordinator {
    engine: Arc<dyn PipelineEngine>,
    secrets: Arc<dyn SecretsResolver>,
    translator: Arc<dyn Translator>,
    policy: ConcurrencyPolicy,
    in_flight: InFlightTable,
}

impl RunCoordinator {
    /// Creates a coordinator with the `Reject` policy
    pub fn new(
        engine: Arc<dyn PipelineEngine>,
        secrets: Arc<dyn SecretsResolver>,
        translator: Arc<dyn Translator>,
    ) -> Self {
        Self {
            engine,
            secrets,
            translator,
            policy: ConcurrencyPolicy::default(),
            in_flight: InFlightTable::new(),
        }
    }

    pub fn with_policy(mut self, policy: ConcurrencyPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> ConcurrencyPolicy {
        self.policy
    }

    pub fn translator(&self) -> &Arc<dyn Translator> {
        &self.translator
    }

    /// Whether `pipeline` currently has a run in flight
    pub fn is_in_flight(&self, pipeline: &str) -> bool {
        self.in_flight.is_in_flight(pipeline)
    }

    /// Runs `pipeline` once and reports what happened to each resource
    ///
    /// Never fails outright: run-level problems are set on
    /// `RunOutcome::error` and every resource of the run gets an entry.
    /// The descriptor is validated first; an invalid one ends the run with
    /// `RunError::InvalidPipeline` before any secret or engine is touched.
    pub async fn execute(
        &self,
        pipeline: &PipelineDescriptor,
        trigger: TriggerContext,
    ) -> RunOutcome {
        let run_id = Uuid::new_v4();
        let span = info_span!(
            "run",
            pipeline = %pipeline.name,
            %run_id,
            correlation_id = %trigger.correlation_id
        );

        self.execute_run(run_id, pipeline, trigger)
            .instrument(span)
            .await
    }

    async fn execute_run(
        &self,
        run_id: Uuid,
        pipeline: &PipelineDescriptor,
        trigger: TriggerContext,
    ) -> RunOutcome {
        let started_at = chrono::Utc::now();
        let cancel = trigger.cancellation.clone();

        let index = match ResourceIndex::build(pipeline.clone()) {
            Ok(index) => index,
            Err(err) => {
                warn!("Rejecting invalid pipeline: {}", err);
                let ledger = RunLedger::new(pipeline);
                let err = RunError::InvalidPipeline {
                    message: err.to_string(),
                };
                return finish(run_id, pipeline, &trigger, ledger, Some(err), started_at);
            }
        };

        let run_pipeline = match self.select(&index, trigger.selection.as_ref()) {
            Ok(selected) => selected,
            Err(err) => {
                warn!("Rejecting run: {}", err);
                let ledger = RunLedger::new(pipeline);
                return finish(run_id, pipeline, &trigger, ledger, Some(err), started_at);
            }
        };
        let ledger = RunLedger::new(&run_pipeline);

        let _guard = match self.policy {
            ConcurrencyPolicy::Reject => match self.in_flight.try_acquire(&pipeline.name) {
                Some(guard) => guard,
                None => {
                    warn!("Pipeline '{}' already has a run in flight", pipeline.name);
                    let err = RunError::ConcurrentRunRejected {
                        pipeline: pipeline.name.clone(),
                    };
                    return finish(run_id, &run_pipeline, &trigger, ledger, Some(err), started_at);
                }
            },
            ConcurrencyPolicy::Queue => {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        info!("Run cancelled while queued");
                        let err = Some(RunError::Cancelled);
                        return finish(run_id, &run_pipeline, &trigger, ledger, err, started_at);
                    }
                    guard = self.in_flight.acquire(&pipeline.name) => guard,
                }
            }
        };

        let names: BTreeSet<String> = run_pipeline.secrets.iter().cloned().collect();
        let secrets = match self.secrets.resolve(&names) {
            Ok(secrets) => secrets,
            Err(err) => {
                warn!("Secret resolution failed: {}", err);
                let name = match err {
                    SecretsError::Missing(name) | SecretsError::InvalidName(name) => name,
                };
                let err = RunError::MissingSecret { name };
                return finish(run_id, &run_pipeline, &trigger, ledger, Some(err), started_at);
            }
        };

        info!(
            "Starting pipeline '{}' with {} resource(s)",
            run_pipeline.name,
            run_pipeline.resources.len()
        );

        let started = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            started = self.engine.run(&run_pipeline, secrets) => Some(started),
        };
        let mut stream = match started {
            Some(Ok(stream)) => stream,
            Some(Err(e)) => {
                error!("Engine failed to start: {:#}", e);
                let err = RunError::EngineStart {
                    message: format!("{:#}", e),
                };
                return finish(run_id, &run_pipeline, &trigger, ledger, Some(err), started_at);
            }
            None => {
                info!("Run cancelled before the engine started");
                let err = Some(RunError::Cancelled);
                return finish(run_id, &run_pipeline, &trigger, ledger, err, started_at);
            }
        };

        let mut ledger = ledger;
        let error = loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(
                        "Run cancelled with {} unresolved resource(s)",
                        ledger.unresolved().len()
                    );
                    break Some(RunError::Cancelled);
                }
                next = stream.next() => next,
            };

            let Some(event) = next else {
                warn!("Engine closed the event stream without ending the run");
                break Some(RunError::protocol(
                    "event stream ended without run_completed or run_failed",
                ));
            };

            debug!("Event {} {}", event.kind(), event.resource().unwrap_or("-"));

            match ledger.apply(&event, self.translator.as_ref()) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Finished(err)) => break err,
                Err(violation) => {
                    warn!("{}", violation);
                    break Some(violation);
                }
            }
        };

        // Stop the engine from pushing more events before the slot is released
        drop(stream);

        finish(run_id, &run_pipeline, &trigger, ledger, error, started_at)
    }

    /// Narrows the pipeline to the selected assets
    ///
    /// An empty selection is rejected rather than treated as a run over
    /// nothing.
    fn select(
        &self,
        index: &ResourceIndex,
        selection: Option<&BTreeSet<String>>,
    ) -> Result<PipelineDescriptor, RunError> {
        let pipeline = index.pipeline();
        let Some(selection) = selection else {
            return Ok(pipeline.clone());
        };
        if selection.is_empty() {
            return Err(RunError::EmptySelection);
        }

        let mut resources = BTreeSet::new();
        let mut matched = BTreeSet::new();
        for resource in &pipeline.resources {
            let asset = self.translator.asset_name(pipeline, &resource.name);
            if selection.contains(&asset) {
                resources.insert(resource.name.clone());
                matched.insert(asset);
            }
        }

        let unknown: Vec<String> = selection.difference(&matched).cloned().collect();
        if !unknown.is_empty() {
            return Err(RunError::InvalidSelection { assets: unknown });
        }

        Ok(index.subset(&resources))
    }
}

fn finish(
    run_id: Uuid,
    pipeline: &PipelineDescriptor,
    trigger: &TriggerContext,
    ledger: RunLedger,
    error: Option<RunError>,
    started_at: chrono::DateTime<chrono::Utc>,
) -> RunOutcome {
    let resources = ledger.finish();
    let status = RunStatus::from_results(&resources, error.as_ref());

    let outcome = RunOutcome {
        run_id,
        pipeline: pipeline.name.clone(),
        correlation_id: trigger.correlation_id.clone(),
        status,
        resources,
        error,
        started_at,
        finished_at: chrono::Utc::now(),
    };

    let (ok, failed, incomplete) = outcome.tally();
    match &outcome.error {
        Some(err) => info!(
            "Run finished with error '{}': {} succeeded, {} failed, {} incomplete",
            err, ok, failed, incomplete
        ),
        None => info!(
            "Run finished: {} succeeded, {} failed, {} incomplete",
            ok, failed, incomplete
        ),
    }
    for result in outcome
        .resources
        .iter()
        .filter(|r| r.status == ResourceStatus::Failed)
    {
        warn!(
            "Resource '{}' failed: {}",
            result.resource,
            result.error.as_deref().unwrap_or("unknown error")
        );
    }

    outcome
}
