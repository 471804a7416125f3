//! Event demultiplexing
//!
//! Tracks every resource of a run through pending -> running -> terminal as
//! engine events arrive, and turns the final state into per-resource results.

use sluice_core::domain::Metadata;
use sluice_core::domain::event::RunEvent;
use sluice_core::domain::outcome::{ResourceResult, ResourceStatus, RunError};
use sluice_core::domain::pipeline::{PipelineDescriptor, ResourceDescriptor};
use std::collections::HashMap;

use crate::translator::Translator;

type Timestamp = chrono::DateTime<chrono::Utc>;

#[derive(Debug)]
enum Progress {
    Pending,
    Running { started_at: Timestamp },
    Done(ResourceResult),
}

/// What the coordinator should do after an event
#[derive(Debug, PartialEq)]
pub(crate) enum Flow {
    Continue,
    /// The engine ended the run, optionally with a run-level error
    Finished(Option<RunError>),
}

/// Per-run resource state
pub(crate) struct RunLedger {
    resources: Vec<(ResourceDescriptor, Progress)>,
    positions: HashMap<String, usize>,
}

impl RunLedger {
    pub(crate) fn new(pipeline: &PipelineDescriptor) -> Self {
        // Repeated names keep their first declaration only
        let mut positions = HashMap::with_capacity(pipeline.resources.len());
        let mut resources = Vec::with_capacity(pipeline.resources.len());
        for resource in &pipeline.resources {
            if positions.contains_key(&resource.name) {
                continue;
            }
            positions.insert(resource.name.clone(), resources.len());
            resources.push((resource.clone(), Progress::Pending));
        }

        Self {
            resources,
            positions,
        }
    }

    /// Applies one event
    ///
    /// # Errors
    /// `RunError::ProtocolViolation` when the event names a resource outside
    /// the run, starts a resource twice, or reports a terminal event for a
    /// resource that is not running. The ledger is left unchanged.
    pub(crate) fn apply(
        &mut self,
        event: &RunEvent,
        translator: &dyn Translator,
    ) -> Result<Flow, RunError> {
        let name = match event {
            RunEvent::RunCompleted => return Ok(Flow::Finished(None)),
            RunEvent::RunFailed { error } => {
                return Ok(Flow::Finished(Some(RunError::EngineFailed {
                    message: error.clone(),
                })));
            }
            other => other.resource().unwrap_or_default(),
        };

        let idx = *self.positions.get(name).ok_or_else(|| {
            RunError::protocol(format!(
                "{} for resource '{}' which is not part of this run",
                event.kind(),
                name
            ))
        })?;
        let (resource, progress) = &mut self.resources[idx];
        let pending = matches!(&*progress, Progress::Pending);
        let running_since = match &*progress {
            Progress::Running { started_at } => Some(*started_at),
            _ => None,
        };
        let now = chrono::Utc::now();

        let next = match (event, running_since) {
            (RunEvent::ResourceStarted { .. }, _) if pending => {
                Progress::Running { started_at: now }
            }
            (RunEvent::ResourceStarted { .. }, _) => {
                return Err(RunError::protocol(format!(
                    "resource '{}' started more than once",
                    name
                )));
            }
            (RunEvent::ResourceCompleted { .. }, Some(started_at)) => {
                Progress::Done(ResourceResult {
                    resource: resource.name.clone(),
                    status: ResourceStatus::Success,
                    metadata: translator.event_to_metadata(resource, event),
                    error: None,
                    started_at: Some(started_at),
                    completed_at: Some(now),
                })
            }
            (RunEvent::ResourceFailed { error, .. }, Some(started_at)) => {
                Progress::Done(ResourceResult {
                    resource: resource.name.clone(),
                    status: ResourceStatus::Failed,
                    metadata: translator.event_to_metadata(resource, event),
                    error: Some(error.clone()),
                    started_at: Some(started_at),
                    completed_at: Some(now),
                })
            }
            _ if pending => {
                return Err(RunError::protocol(format!(
                    "{} for resource '{}' without a preceding resource_started",
                    event.kind(),
                    name
                )));
            }
            _ => {
                return Err(RunError::protocol(format!(
                    "{} for resource '{}' which already finished",
                    event.kind(),
                    name
                )));
            }
        };

        *progress = next;
        Ok(Flow::Continue)
    }

    /// Names of resources that have not reached a terminal state
    pub(crate) fn unresolved(&self) -> Vec<&str> {
        self.resources
            .iter()
            .filter(|(_, p)| !matches!(p, Progress::Done(_)))
            .map(|(r, _)| r.name.as_str())
            .collect()
    }

    /// Final results in pipeline order; unresolved resources become `Incomplete`
    pub(crate) fn finish(self) -> Vec<ResourceResult> {
        self.resources
            .into_iter()
            .map(|(resource, progress)| match progress {
                Progress::Done(result) => result,
                Progress::Pending => incomplete(resource.name, None),
                Progress::Running { started_at } => incomplete(resource.name, Some(started_at)),
            })
            .collect()
    }
}

fn incomplete(resource: String, started_at: Option<Timestamp>) -> ResourceResult {
    ResourceResult {
        resource,
        status: ResourceStatus::Incomplete,
        metadata: Metadata::new(),
        error: None,
        started_at,
        completed_at: None,
    }
}
