//! Asset domain types

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use super::Metadata;

/// Asset declared to the orchestration graph
///
/// Exactly one per resource; produced by a translator at definition time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetSpec {
    pub name: String,
    pub group: String,
    /// Resource this asset was derived from
    pub resource: String,
    pub description: Option<String>,
    /// Upstream asset names
    pub deps: BTreeSet<String>,
    pub metadata: Metadata,
}

/// Record asserting that an asset was produced during a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterializationRecord {
    pub asset: String,
    pub resource: String,
    pub run_id: Uuid,
    pub correlation_id: String,
    pub metadata: Metadata,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub recorded_at: chrono::DateTime<chrono::Utc>,
}

impl MaterializationRecord {
    /// Wall time between the resource starting and completing, if both are known
    pub fn duration(&self) -> Option<chrono::Duration> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }
}
