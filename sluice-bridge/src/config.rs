//! Bridge configuration
//!
//! Defines the deployment-specific knobs of the bridge: where the
//! orchestration graph lives, how concurrent triggers are handled, how
//! assets are named and where secrets come from.

use std::str::FromStr;

use crate::coordinator::ConcurrencyPolicy;
use crate::translator::DefaultTranslator;

/// Bridge configuration
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Orchestration graph base URL (e.g., "http://localhost:3000"), `None`
    /// keeps materializations in memory
    pub orchestrator_url: Option<String>,

    /// What a trigger does when its pipeline already has a run in flight
    pub concurrency_policy: ConcurrencyPolicy,

    /// Prefix asset names with the pipeline name
    pub prefix_assets: bool,

    /// Asset group override, defaults to the pipeline name
    pub asset_group: Option<String>,

    /// Prefix prepended to secret names when reading the environment
    pub secret_prefix: String,

    /// Capacity of the engine event channel
    pub event_buffer: usize,
}

impl BridgeConfig {
    /// Creates a configuration with defaults
    pub fn new() -> Self {
        Self {
            orchestrator_url: None,
            concurrency_policy: ConcurrencyPolicy::Reject,
            prefix_assets: false,
            asset_group: None,
            secret_prefix: String::new(),
            event_buffer: 64,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables (all optional):
    /// - SLUICE_ORCHESTRATOR_URL
    /// - SLUICE_CONCURRENCY_POLICY (`reject` or `queue`, default: reject)
    /// - SLUICE_PREFIX_ASSETS (`true`/`false`, default: false)
    /// - SLUICE_ASSET_GROUP
    /// - SLUICE_SECRET_PREFIX (default: empty)
    /// - SLUICE_EVENT_BUFFER (default: 64)
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::new();

        let orchestrator_url = std::env::var("SLUICE_ORCHESTRATOR_URL").ok();

        let concurrency_policy = match std::env::var("SLUICE_CONCURRENCY_POLICY") {
            Ok(raw) => raw.parse()?,
            Err(_) => defaults.concurrency_policy,
        };

        let prefix_assets = match std::env::var("SLUICE_PREFIX_ASSETS") {
            Ok(raw) => raw.parse::<bool>().map_err(|_| {
                anyhow::anyhow!("SLUICE_PREFIX_ASSETS must be true or false, got '{}'", raw)
            })?,
            Err(_) => defaults.prefix_assets,
        };

        let asset_group = std::env::var("SLUICE_ASSET_GROUP").ok();

        let secret_prefix = std::env::var("SLUICE_SECRET_PREFIX").unwrap_or_default();

        let event_buffer = std::env::var("SLUICE_EVENT_BUFFER")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(defaults.event_buffer);

        Ok(Self {
            orchestrator_url,
            concurrency_policy,
            prefix_assets,
            asset_group,
            secret_prefix,
            event_buffer,
        })
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(url) = &self.orchestrator_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                anyhow::bail!("orchestrator_url must start with http:// or https://");
            }
        }

        if matches!(&self.asset_group, Some(group) if group.trim().is_empty()) {
            anyhow::bail!("asset_group cannot be blank");
        }

        if self.event_buffer == 0 {
            anyhow::bail!("event_buffer must be greater than 0");
        }

        Ok(())
    }

    /// Builds the default translator for this configuration
    pub fn translator(&self) -> DefaultTranslator {
        let translator = DefaultTranslator::new().prefixed(self.prefix_assets);
        match &self.asset_group {
            Some(group) => translator.with_group(group.clone()),
            None => translator,
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for ConcurrencyPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(ConcurrencyPolicy::Reject),
            "queue" => Ok(ConcurrencyPolicy::Queue),
            other => anyhow::bail!(
                "unknown concurrency policy '{}', expected reject or queue",
                other
            ),
        }
    }
}
