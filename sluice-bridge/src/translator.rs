//! Translator between pipeline vocabulary and orchestration-graph vocabulary
//!
//! Naming and grouping conventions differ between deployments, so they live
//! behind the `Translator` trait. The coordinator and emitter only ever call
//! through the trait, which lets a deployment swap the mapping without
//! touching run handling.

use serde_json::{Value as JsonValue, json};
use sluice_core::domain::Metadata;
use sluice_core::domain::asset::AssetSpec;
use sluice_core::domain::event::RunEvent;
use sluice_core::domain::pipeline::{PipelineDescriptor, ResourceDescriptor};

/// Metadata key for rows loaded by a resource
pub const ROW_COUNT: &str = "row_count";
/// Metadata key for the incremental cursor after a load
pub const CURSOR: &str = "cursor";
/// Metadata key for the resource's write disposition
pub const WRITE_DISPOSITION: &str = "write_disposition";
/// Metadata key for bytes loaded, when the engine reports it
pub const BYTES: &str = "bytes";
/// Metadata key for the primary key declared on the resource
pub const PRIMARY_KEY: &str = "primary_key";
/// Metadata key for a resource failure message
pub const ERROR: &str = "error";

/// Maps resources to assets and run events to asset metadata
pub trait Translator: Send + Sync {
    /// Asset name for a resource of `pipeline`
    ///
    /// Used for both the asset itself and the names of its upstream deps, so
    /// overriding it keeps dependency edges consistent.
    fn asset_name(&self, pipeline: &PipelineDescriptor, resource: &str) -> String;

    /// Builds the asset declared for a resource
    fn resource_to_asset(
        &self,
        pipeline: &PipelineDescriptor,
        resource: &ResourceDescriptor,
    ) -> AssetSpec;

    /// Converts a run event about `resource` into asset metadata
    fn event_to_metadata(&self, resource: &ResourceDescriptor, event: &RunEvent) -> Metadata;
}

/// Default naming: asset name = resource name, group = pipeline name
#[derive(Debug, Clone, Default)]
pub struct DefaultTranslator {
    prefix_with_pipeline: bool,
    group: Option<String>,
}

impl DefaultTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names assets `<pipeline>__<resource>` so several pipelines can share a graph
    pub fn prefixed(mut self, prefix_with_pipeline: bool) -> Self {
        self.prefix_with_pipeline = prefix_with_pipeline;
        self
    }

    /// Puts every asset in `group` instead of the pipeline's own group
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }
}

impl Translator for DefaultTranslator {
    fn asset_name(&self, pipeline: &PipelineDescriptor, resource: &str) -> String {
        if self.prefix_with_pipeline {
            format!("{}__{}", pipeline.name, resource)
        } else {
            resource.to_string()
        }
    }

    fn resource_to_asset(
        &self,
        pipeline: &PipelineDescriptor,
        resource: &ResourceDescriptor,
    ) -> AssetSpec {
        let mut metadata = Metadata::new();
        metadata.insert(
            WRITE_DISPOSITION.to_string(),
            json!(resource.write_disposition.as_str()),
        );
        if let Some(key) = &resource.primary_key {
            metadata.insert(PRIMARY_KEY.to_string(), json!(key));
        }

        AssetSpec {
            name: self.asset_name(pipeline, &resource.name),
            group: self.group.clone().unwrap_or_else(|| pipeline.name.clone()),
            resource: resource.name.clone(),
            description: resource.description.clone(),
            deps: resource
                .depends_on
                .iter()
                .map(|dep| self.asset_name(pipeline, dep))
                .collect(),
            metadata,
        }
    }

    fn event_to_metadata(&self, resource: &ResourceDescriptor, event: &RunEvent) -> Metadata {
        let mut metadata = Metadata::new();

        match event {
            RunEvent::ResourceCompleted {
                rows,
                bytes,
                cursor,
                ..
            } => {
                metadata.insert(ROW_COUNT.to_string(), json!(rows));
                metadata.insert(
                    CURSOR.to_string(),
                    cursor.clone().unwrap_or(JsonValue::Null),
                );
                if let Some(bytes) = bytes {
                    metadata.insert(BYTES.to_string(), json!(bytes));
                }
            }
            RunEvent::ResourceFailed { error, .. } => {
                metadata.insert(ERROR.to_string(), json!(error));
            }
            _ => return metadata,
        }

        metadata.insert(
            WRITE_DISPOSITION.to_string(),
            json!(resource.write_disposition.as_str()),
        );
        metadata
    }
}
