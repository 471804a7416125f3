//! Assets command handler

use anyhow::Result;
use colored::*;
use sluice_bridge::Definitions;
use sluice_core::domain::asset::AssetSpec;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Config;
use crate::loader::load_definitions;

/// List the assets the pipelines declare, optionally registering them
pub async fn handle_assets(paths: &[PathBuf], register: bool, config: &Config) -> Result<()> {
    let mut definitions = Definitions::new(Arc::new(config.bridge.translator()));
    load_definitions(&mut definitions, paths)?;

    let specs = definitions.asset_specs();
    if specs.is_empty() {
        println!("{}", "No assets declared.".yellow());
    } else {
        println!("{}", format!("Found {} asset(s):", specs.len()).bold());
        println!();
        for spec in &specs {
            print_asset(spec);
        }
    }

    if register {
        let graph = super::graph(config);
        let registered = definitions.register(graph.as_ref()).await?;
        println!(
            "{}",
            format!("✓ Registered {} asset(s)", registered).green().bold()
        );
    }

    Ok(())
}

fn print_asset(spec: &AssetSpec) {
    println!("  {} {}", "▸".cyan(), spec.name.bold());
    println!("    Group:    {}", spec.group.dimmed());
    println!("    Resource: {}", spec.resource.dimmed());
    if let Some(description) = &spec.description {
        println!("    About:    {}", description.dimmed());
    }
    if !spec.deps.is_empty() {
        let deps: Vec<&str> = spec.deps.iter().map(String::as_str).collect();
        println!("    Deps:     {}", deps.join(", "));
    }
    for (key, value) in &spec.metadata {
        println!("    {}: {}", key.dimmed(), value);
    }
    println!();
}
