//! Run events emitted by a pipeline engine

use serde::{Deserialize, Serialize};

/// Event yielded by the pipeline engine during one run
///
/// Events are consumed in emission order. A resource's terminal event
/// (`ResourceCompleted` or `ResourceFailed`) must follow its `ResourceStarted`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    ResourceStarted {
        resource: String,
    },
    ResourceCompleted {
        resource: String,
        rows: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bytes: Option<u64>,
        /// Incremental cursor state after the load, engine-defined shape
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cursor: Option<serde_json::Value>,
    },
    ResourceFailed {
        resource: String,
        error: String,
    },
    RunCompleted,
    RunFailed {
        error: String,
    },
}

impl RunEvent {
    pub fn started(resource: impl Into<String>) -> Self {
        RunEvent::ResourceStarted {
            resource: resource.into(),
        }
    }

    pub fn completed(resource: impl Into<String>, rows: u64) -> Self {
        RunEvent::ResourceCompleted {
            resource: resource.into(),
            rows,
            bytes: None,
            cursor: None,
        }
    }

    pub fn failed(resource: impl Into<String>, error: impl Into<String>) -> Self {
        RunEvent::ResourceFailed {
            resource: resource.into(),
            error: error.into(),
        }
    }

    /// Resource the event refers to, `None` for run-level events
    pub fn resource(&self) -> Option<&str> {
        match self {
            RunEvent::ResourceStarted { resource }
            | RunEvent::ResourceCompleted { resource, .. }
            | RunEvent::ResourceFailed { resource, .. } => Some(resource),
            RunEvent::RunCompleted | RunEvent::RunFailed { .. } => None,
        }
    }

    /// Whether this event ends the run
    pub fn is_run_terminal(&self) -> bool {
        matches!(self, RunEvent::RunCompleted | RunEvent::RunFailed { .. })
    }

    /// Short name used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            RunEvent::ResourceStarted { .. } => "resource_started",
            RunEvent::ResourceCompleted { .. } => "resource_completed",
            RunEvent::ResourceFailed { .. } => "resource_failed",
            RunEvent::RunCompleted => "run_completed",
            RunEvent::RunFailed { .. } => "run_failed",
        }
    }
}
