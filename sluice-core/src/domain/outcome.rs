//! Run outcome types

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::Metadata;

/// Result of one triggered run
///
/// Always complete: every resource of the run has an entry, even when the run
/// ended early. Run-level problems are carried in `error` instead of being
/// raised, so the orchestrator can inspect partial progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    pub run_id: Uuid,
    pub pipeline: String,
    pub correlation_id: String,
    pub status: RunStatus,
    /// Per-resource results in pipeline order
    pub resources: Vec<ResourceResult>,
    pub error: Option<RunError>,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub finished_at: chrono::DateTime<chrono::Utc>,
}

impl RunOutcome {
    /// Looks up the result for a resource
    pub fn resource(&self, name: &str) -> Option<&ResourceResult> {
        self.resources.iter().find(|r| r.resource == name)
    }

    /// Resources that reached `Success`
    pub fn succeeded(&self) -> impl Iterator<Item = &ResourceResult> {
        self.resources
            .iter()
            .filter(|r| r.status == ResourceStatus::Success)
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }

    /// Counts resources per terminal status: (success, failed, incomplete)
    pub fn tally(&self) -> (usize, usize, usize) {
        self.resources
            .iter()
            .fold((0, 0, 0), |(ok, failed, incomplete), r| match r.status {
                ResourceStatus::Success => (ok + 1, failed, incomplete),
                ResourceStatus::Failed => (ok, failed + 1, incomplete),
                ResourceStatus::Incomplete => (ok, failed, incomplete + 1),
            })
    }
}

/// Overall run status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    Failed,
}

impl RunStatus {
    /// Derives the run status from resource results and the run-level error
    pub fn from_results(resources: &[ResourceResult], error: Option<&RunError>) -> Self {
        let all_succeeded = resources
            .iter()
            .all(|r| r.status == ResourceStatus::Success);

        if error.is_none() && all_succeeded {
            RunStatus::Success
        } else {
            RunStatus::Failed
        }
    }
}

/// Terminal status of a single resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    Success,
    /// The engine reported a failure for this resource
    Failed,
    /// The run ended without the engine reporting this resource
    Incomplete,
}

/// Per-resource entry of a run outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceResult {
    pub resource: String,
    pub status: ResourceStatus,
    pub metadata: Metadata,
    pub error: Option<String>,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Run-level failure reported on a `RunOutcome`
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunError {
    #[error("pipeline '{pipeline}' already has a run in flight")]
    ConcurrentRunRejected { pipeline: String },

    #[error("missing secret '{name}'")]
    MissingSecret { name: String },

    #[error("invalid pipeline: {message}")]
    InvalidPipeline { message: String },

    #[error("selection is empty")]
    EmptySelection,

    #[error("selection references unknown assets: {}", assets.join(", "))]
    InvalidSelection { assets: Vec<String> },

    #[error("engine failed to start: {message}")]
    EngineStart { message: String },

    #[error("engine reported run failure: {message}")]
    EngineFailed { message: String },

    #[error("engine protocol violation: {message}")]
    ProtocolViolation { message: String },

    #[error("run cancelled")]
    Cancelled,
}

impl RunError {
    /// Whether the trigger source may simply re-trigger the run
    ///
    /// Protocol violations and configuration-like failures are never
    /// retryable; they point at a bug or a missing setting.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RunError::ConcurrentRunRejected { .. } | RunError::Cancelled
        )
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        RunError::ProtocolViolation {
            message: message.into(),
        }
    }
}
