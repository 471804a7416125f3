//! Error types for the bridge
//!
//! Run-level failures are not here: they are reported on the outcome as
//! `sluice_core::domain::outcome::RunError`.

use thiserror::Error;

/// Invalid pipeline definition, detected at definition time
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("pipeline name cannot be empty")]
    EmptyPipelineName,

    #[error("pipeline '{pipeline}' has a resource with an empty name")]
    EmptyResourceName { pipeline: String },

    #[error("pipeline '{pipeline}' declares resource '{resource}' more than once")]
    DuplicateResource { pipeline: String, resource: String },

    #[error("resource '{resource}' in pipeline '{pipeline}' depends on unknown resource '{missing}'")]
    DanglingDependency {
        pipeline: String,
        resource: String,
        missing: String,
    },

    #[error("resource '{resource}' in pipeline '{pipeline}' depends on itself")]
    SelfDependency { pipeline: String, resource: String },

    #[error("pipeline '{pipeline}' has a dependency cycle through: {}", resources.join(" -> "))]
    DependencyCycle {
        pipeline: String,
        resources: Vec<String>,
    },

    #[error("resource '{resource}' in pipeline '{pipeline}' has an empty primary key field")]
    EmptyPrimaryKeyField { pipeline: String, resource: String },

    #[error("pipeline '{0}' is already defined")]
    DuplicatePipeline(String),

    #[error("asset '{asset}' is produced by both '{first}' and '{second}'")]
    DuplicateAsset {
        asset: String,
        first: String,
        second: String,
    },
}

/// Failure to resolve the secrets a run needs
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecretsError {
    #[error("missing secret '{0}'")]
    Missing(String),

    #[error("invalid secret name '{0}'")]
    InvalidName(String),
}

/// Failure while emitting materializations
#[derive(Debug, Error)]
pub enum EmitError {
    /// A successful resource has no declared asset; the caller passed specs
    /// that do not belong to this pipeline.
    #[error("no asset spec for resource '{0}'")]
    MissingAssetSpec(String),

    #[error("failed to write materializations to the graph")]
    Graph(#[source] anyhow::Error),
}
