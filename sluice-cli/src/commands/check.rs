//! Check command handler

use anyhow::Result;
use colored::*;
use sluice_bridge::Definitions;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Config;
use crate::loader::load_definitions;

/// Validate pipeline files and summarize each one
pub fn handle_check(paths: &[PathBuf], config: &Config) -> Result<()> {
    let mut definitions = Definitions::new(Arc::new(config.bridge.translator()));
    load_definitions(&mut definitions, paths)?;

    println!(
        "{}",
        format!("✓ {} pipeline(s) valid", paths.len()).green().bold()
    );
    println!();

    for name in definitions.pipeline_names() {
        let Some(index) = definitions.index(name) else {
            continue;
        };
        let pipeline = index.pipeline();

        println!("  {} {}", "▸".cyan(), pipeline.name.bold());
        println!("    Destination: {}", pipeline.destination.name.dimmed());
        println!("    Resources:   {}", index.len());
        if !pipeline.secrets.is_empty() {
            println!("    Secrets:     {}", pipeline.secrets.join(", ").dimmed());
        }
        for resource in index.resources() {
            let deps = if resource.depends_on.is_empty() {
                String::new()
            } else {
                format!(" <- {}", resource.depends_on.join(", "))
            };
            println!(
                "      - {} [{}]{}",
                resource.name.cyan(),
                resource.write_disposition,
                deps.dimmed()
            );
        }
        println!();
    }

    Ok(())
}
