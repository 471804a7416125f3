//! Materialization emitter
//!
//! Turns the successful resources of a run outcome into materialization
//! records and writes them into the orchestration graph's run log.

use sluice_core::domain::asset::{AssetSpec, MaterializationRecord};
use sluice_core::domain::outcome::RunOutcome;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::EmitError;
use crate::graph::OrchestrationGraph;

/// Writes run results into the graph
#[derive(Clone)]
pub struct MaterializationEmitter {
    graph: Arc<dyn OrchestrationGraph>,
}

impl MaterializationEmitter {
    pub fn new(graph: Arc<dyn OrchestrationGraph>) -> Self {
        Self { graph }
    }

    /// Records one materialization per successful resource
    ///
    /// `specs` is keyed by resource name. Returns the records written; when
    /// nothing succeeded the graph is not called at all.
    ///
    /// # Errors
    /// - `EmitError::MissingAssetSpec` if a successful resource has no spec,
    ///   in which case nothing is written
    /// - `EmitError::Graph` if the graph rejects the batch
    pub async fn emit(
        &self,
        outcome: &RunOutcome,
        specs: &HashMap<String, AssetSpec>,
    ) -> Result<Vec<MaterializationRecord>, EmitError> {
        let records = build_records(outcome, specs)?;

        if records.is_empty() {
            debug!("Run {} produced no materializations", outcome.run_id);
            return Ok(records);
        }

        self.graph
            .record_materializations(&records)
            .await
            .map_err(EmitError::Graph)?;

        info!(
            "Recorded {} materialization(s) for run {}",
            records.len(),
            outcome.run_id
        );

        Ok(records)
    }
}

/// Builds the records `emit` would write, without writing them
///
/// Run metadata wins over spec metadata on key collisions.
pub fn build_records(
    outcome: &RunOutcome,
    specs: &HashMap<String, AssetSpec>,
) -> Result<Vec<MaterializationRecord>, EmitError> {
    let recorded_at = chrono::Utc::now();

    outcome
        .succeeded()
        .map(|result| {
            let spec = specs
                .get(&result.resource)
                .ok_or_else(|| EmitError::MissingAssetSpec(result.resource.clone()))?;

            let mut metadata = spec.metadata.clone();
            metadata.extend(result.metadata.clone());

            Ok(MaterializationRecord {
                asset: spec.name.clone(),
                resource: result.resource.clone(),
                run_id: outcome.run_id,
                correlation_id: outcome.correlation_id.clone(),
                metadata,
                started_at: result.started_at,
                completed_at: result.completed_at,
                recorded_at,
            })
        })
        .collect()
}
