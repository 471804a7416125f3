//! In-memory orchestration graph
//!
//! Keeps declared assets and the run log in process. Cloning shares the same
//! storage, so a test (or the CLI) can keep a handle and inspect what the
//! bridge wrote.

use anyhow::Result;
use async_trait::async_trait;
use sluice_core::domain::asset::{AssetSpec, MaterializationRecord};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use super::OrchestrationGraph;

#[derive(Debug, Default)]
struct GraphState {
    assets: BTreeMap<String, AssetSpec>,
    run_log: Vec<MaterializationRecord>,
}

/// Orchestration graph held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryGraph {
    state: Arc<Mutex<GraphState>>,
}

impl InMemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, GraphState> {
        // A panic while holding the lock cannot leave the maps half-written
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Declared assets, sorted by name
    pub fn assets(&self) -> Vec<AssetSpec> {
        self.lock().assets.values().cloned().collect()
    }

    pub fn asset(&self, name: &str) -> Option<AssetSpec> {
        self.lock().assets.get(name).cloned()
    }

    /// Every materialization recorded so far, in arrival order
    pub fn materializations(&self) -> Vec<MaterializationRecord> {
        self.lock().run_log.clone()
    }

    /// Materializations recorded for one run
    pub fn materializations_for_run(&self, run_id: Uuid) -> Vec<MaterializationRecord> {
        self.lock()
            .run_log
            .iter()
            .filter(|r| r.run_id == run_id)
            .cloned()
            .collect()
    }

    /// Most recent materialization of an asset
    pub fn latest_materialization(&self, asset: &str) -> Option<MaterializationRecord> {
        self.lock()
            .run_log
            .iter()
            .rev()
            .find(|r| r.asset == asset)
            .cloned()
    }
}

#[async_trait]
impl OrchestrationGraph for InMemoryGraph {
    async fn register_assets(&self, specs: &[AssetSpec]) -> Result<()> {
        let mut state = self.lock();
        for spec in specs {
            state.assets.insert(spec.name.clone(), spec.clone());
        }
        Ok(())
    }

    async fn record_materializations(&self, records: &[MaterializationRecord]) -> Result<()> {
        self.lock().run_log.extend_from_slice(records);
        Ok(())
    }
}
