//! Configuration module
//!
//! Layers command-line flags over the bridge's environment configuration.

use anyhow::Result;
use sluice_bridge::BridgeConfig;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub bridge: BridgeConfig,
}

impl Config {
    /// Reads `SLUICE_*` variables, then applies flags given on the command line
    pub fn load(orchestrator_url: Option<String>, prefix_assets: bool) -> Result<Self> {
        let mut bridge = BridgeConfig::from_env()?;

        if orchestrator_url.is_some() {
            bridge.orchestrator_url = orchestrator_url;
        }
        if prefix_assets {
            bridge.prefix_assets = true;
        }

        bridge.validate()?;
        Ok(Self { bridge })
    }
}
