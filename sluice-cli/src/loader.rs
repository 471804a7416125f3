//! Pipeline file loading
//!
//! Pipelines are JSON documents deserialized into `PipelineDescriptor`.

use anyhow::{Context, Result};
use sluice_bridge::Definitions;
use sluice_core::domain::pipeline::PipelineDescriptor;
use std::path::Path;

/// Reads one pipeline definition
pub fn read_pipeline(path: &Path) -> Result<PipelineDescriptor> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read pipeline file: {}", path.display()))?;

    serde_json::from_str(&content)
        .with_context(|| format!("Invalid pipeline definition in {}", path.display()))
}

/// Reads and registers every pipeline, failing on the first invalid one
pub fn load_definitions(definitions: &mut Definitions, paths: &[impl AsRef<Path>]) -> Result<()> {
    for path in paths {
        let path = path.as_ref();
        let pipeline = read_pipeline(path)?;
        definitions
            .add_pipeline(pipeline)
            .with_context(|| format!("Invalid pipeline in {}", path.display()))?;
    }
    Ok(())
}
