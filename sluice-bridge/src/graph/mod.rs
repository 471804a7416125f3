//! Orchestration graph seam
//!
//! The graph is the system of record: it receives asset declarations at
//! definition time and the materializations of every run. Writing into it is
//! the only externally observable effect of the bridge.

mod http;
mod memory;

pub use http::HttpOrchestrationGraph;
pub use memory::InMemoryGraph;

use anyhow::Result;
use async_trait::async_trait;
use sluice_core::domain::asset::{AssetSpec, MaterializationRecord};

/// External orchestration graph
#[async_trait]
pub trait OrchestrationGraph: Send + Sync {
    /// Declares assets
    async fn register_assets(&self, specs: &[AssetSpec]) -> Result<()>;

    /// Appends materializations to the run log
    ///
    /// All records in one call belong to the same run.
    async fn record_materializations(&self, records: &[MaterializationRecord]) -> Result<()>;
}
