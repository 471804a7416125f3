//! Core domain types
//!
//! Descriptors are built at definition time and never change afterwards.
//! Events and outcomes exist for the duration of a single run; the
//! orchestration graph is the system of record for anything older.

pub mod asset;
pub mod event;
pub mod outcome;
pub mod pipeline;

/// Free-form metadata attached to assets and materializations
pub type Metadata = std::collections::BTreeMap<String, serde_json::Value>;
