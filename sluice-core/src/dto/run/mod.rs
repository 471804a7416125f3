//! Run DTOs for the orchestration graph API

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::asset::MaterializationRecord;

/// Materializations produced by one run, submitted to the graph's run log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterializationBatch {
    pub run_id: Uuid,
    pub records: Vec<MaterializationRecord>,
}

impl MaterializationBatch {
    /// Groups records under their run id
    ///
    /// Returns `None` for an empty slice since there is no run to attach to.
    pub fn from_records(records: &[MaterializationRecord]) -> Option<Self> {
        let run_id = records.first()?.run_id;
        Some(Self {
            run_id,
            records: records.to_vec(),
        })
    }
}

/// Response to a materialization batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchAccepted {
    pub accepted: usize,
}
