//! Sluice bridge
//!
//! Exposes the resources of a data-loading pipeline as assets in an
//! orchestration graph, runs the pipeline on demand and records what each
//! run materialized.
//!
//! The usual flow:
//! 1. Register pipelines in `Definitions` (validates them, derives asset specs)
//! 2. `Definitions::register` declares the assets in the `OrchestrationGraph`
//! 3. Per trigger, `RunCoordinator::execute` runs the pipeline once
//! 4. `MaterializationEmitter::emit` writes the successful resources to the run log

pub mod config;
pub mod coordinator;
pub mod definitions;
pub mod emitter;
pub mod engine;
pub mod error;
pub mod graph;
pub mod index;
pub mod secrets;
pub mod translator;

pub use config::BridgeConfig;
pub use coordinator::{ConcurrencyPolicy, RunCoordinator, TriggerContext};
pub use definitions::Definitions;
pub use emitter::MaterializationEmitter;
pub use engine::{PipelineEngine, ReplayEngine};
pub use error::{ConfigurationError, EmitError, SecretsError};
pub use graph::{HttpOrchestrationGraph, InMemoryGraph, OrchestrationGraph};
pub use index::ResourceIndex;
pub use secrets::{EnvSecretsResolver, ResolvedSecrets, SecretsResolver, StaticSecretsResolver};
pub use translator::{DefaultTranslator, Translator};

// Re-exported so callers can build trigger contexts without a direct dependency
pub use tokio_util::sync::CancellationToken;
