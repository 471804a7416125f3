//! Asset DTOs for the orchestration graph API

use serde::{Deserialize, Serialize};

use crate::domain::asset::AssetSpec;

/// Request to declare assets in the graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterAssets {
    pub assets: Vec<AssetSpec>,
}

/// Response to an asset registration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetsRegistered {
    pub registered: usize,
}
