//! HTTP-backed orchestration graph
//!
//! Adapts `sluice_client::GraphClient` to the `OrchestrationGraph` seam.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sluice_client::GraphClient;
use sluice_core::domain::asset::{AssetSpec, MaterializationRecord};
use sluice_core::dto::run::MaterializationBatch;
use tracing::{debug, warn};

use super::OrchestrationGraph;

/// Orchestration graph reached over its HTTP API
#[derive(Debug, Clone)]
pub struct HttpOrchestrationGraph {
    client: GraphClient,
}

impl HttpOrchestrationGraph {
    /// Creates a graph adapter for the API at `base_url`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(GraphClient::new(base_url))
    }

    pub fn with_client(client: GraphClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &GraphClient {
        &self.client
    }
}

#[async_trait]
impl OrchestrationGraph for HttpOrchestrationGraph {
    async fn register_assets(&self, specs: &[AssetSpec]) -> Result<()> {
        let registered = self
            .client
            .register_assets(specs)
            .await
            .context("Failed to register assets")?;

        if registered != specs.len() {
            warn!(
                "Graph registered {} of {} assets",
                registered,
                specs.len()
            );
        }
        Ok(())
    }

    async fn record_materializations(&self, records: &[MaterializationRecord]) -> Result<()> {
        let Some(batch) = MaterializationBatch::from_records(records) else {
            return Ok(());
        };

        let accepted = self
            .client
            .submit_materializations(&batch)
            .await
            .with_context(|| {
                format!("Failed to submit materializations for run {}", batch.run_id)
            })?;

        debug!(
            "Graph accepted {}/{} materializations for run {}",
            accepted,
            records.len(),
            batch.run_id
        );
        Ok(())
    }
}
