//! Definitions registry
//!
//! Holds every validated pipeline with its index and asset specs for the
//! lifetime of the process. Asset names are unique across the registry.

use anyhow::{Context, Result};
use sluice_core::domain::asset::AssetSpec;
use sluice_core::domain::pipeline::PipelineDescriptor;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::info;

use crate::error::ConfigurationError;
use crate::graph::OrchestrationGraph;
use crate::index::ResourceIndex;
use crate::translator::Translator;

struct Definition {
    index: ResourceIndex,
    /// Keyed by resource name
    specs: HashMap<String, AssetSpec>,
}

/// Registered pipelines and the assets they declare
pub struct Definitions {
    translator: Arc<dyn Translator>,
    pipelines: BTreeMap<String, Definition>,
    /// Asset name -> (pipeline, resource)
    owners: HashMap<String, (String, String)>,
}

impl Definitions {
    pub fn new(translator: Arc<dyn Translator>) -> Self {
        Self {
            translator,
            pipelines: BTreeMap::new(),
            owners: HashMap::new(),
        }
    }

    pub fn translator(&self) -> &Arc<dyn Translator> {
        &self.translator
    }

    /// Validates and registers a pipeline
    ///
    /// # Errors
    /// Anything `ResourceIndex::build` rejects, a pipeline name that is
    /// already registered, or an asset name already produced by another
    /// resource. A rejected pipeline leaves the registry unchanged.
    pub fn add_pipeline(&mut self, pipeline: PipelineDescriptor) -> Result<(), ConfigurationError> {
        if self.pipelines.contains_key(&pipeline.name) {
            return Err(ConfigurationError::DuplicatePipeline(pipeline.name));
        }

        let index = ResourceIndex::build(pipeline)?;

        let mut specs = HashMap::with_capacity(index.len());
        let mut claimed: HashMap<String, String> = HashMap::new();
        for resource in index.resources() {
            let spec = self.translator.resource_to_asset(index.pipeline(), resource);

            let owner = self
                .owners
                .get(&spec.name)
                .map(|(pipeline, resource)| format!("{}.{}", pipeline, resource))
                .or_else(|| {
                    claimed
                        .get(&spec.name)
                        .map(|resource| format!("{}.{}", index.name(), resource))
                });
            if let Some(first) = owner {
                return Err(ConfigurationError::DuplicateAsset {
                    asset: spec.name,
                    first,
                    second: format!("{}.{}", index.name(), resource.name),
                });
            }

            claimed.insert(spec.name.clone(), resource.name.clone());
            specs.insert(resource.name.clone(), spec);
        }

        let name = index.name().to_string();
        for (asset, resource) in claimed {
            self.owners.insert(asset, (name.clone(), resource));
        }
        info!("Defined pipeline '{}' with {} asset(s)", name, specs.len());
        self.pipelines.insert(name, Definition { index, specs });

        Ok(())
    }

    /// Index of a registered pipeline
    pub fn index(&self, pipeline: &str) -> Option<&ResourceIndex> {
        self.pipelines.get(pipeline).map(|d| &d.index)
    }

    pub fn pipeline(&self, name: &str) -> Option<&PipelineDescriptor> {
        self.index(name).map(ResourceIndex::pipeline)
    }

    /// Registered pipeline names, sorted
    pub fn pipeline_names(&self) -> impl Iterator<Item = &str> {
        self.pipelines.keys().map(String::as_str)
    }

    /// Asset specs of one pipeline keyed by resource name, as the emitter expects
    pub fn specs_for(&self, pipeline: &str) -> Option<&HashMap<String, AssetSpec>> {
        self.pipelines.get(pipeline).map(|d| &d.specs)
    }

    /// Every declared asset, sorted by name
    pub fn asset_specs(&self) -> Vec<AssetSpec> {
        let mut specs: Vec<AssetSpec> = self
            .pipelines
            .values()
            .flat_map(|d| d.specs.values().cloned())
            .collect();
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        specs
    }

    /// Declares every asset in the graph
    pub async fn register(&self, graph: &dyn OrchestrationGraph) -> Result<usize> {
        let specs = self.asset_specs();
        graph
            .register_assets(&specs)
            .await
            .context("Failed to register asset definitions")?;

        info!("Registered {} asset(s) with the graph", specs.len());
        Ok(specs.len())
    }
}
