//! Check command implementation
//!
//! Implements `bootgraph check` to validate a graph without building it.

use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::cli::output::{
    is_json, print_detail, print_heading, print_success, print_warning, status,
};
use crate::core::check;
use crate::core::manifest::GraphManifest;

/// Execute the check command
pub fn execute(manifest_path: &Path) -> Result<()> {
    let manifest = GraphManifest::read(manifest_path)
        .with_context(|| format!("Failed to load {}", manifest_path.display()))?;

    tracing::info!(
        "Checking graph {} ({} builders)",
        manifest_path.display(),
        manifest.builders.len()
    );

    let result = check::check(&manifest);

    if is_json() {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        for warning in &result.warnings {
            print_warning(warning);
        }
        if result.is_valid() {
            print_success("Graph is valid");
            print_heading("Build order:");
            if result.order.is_empty() {
                print_detail("(none)");
            }
            for (i, name) in result.order.iter().enumerate() {
                print_detail(&format!("{}. {name}", i + 1));
            }
        }
    }

    if let Some(error) = result.error {
        if !is_json() {
            eprintln!("{} Graph is invalid", status::ERROR);
        }
        bail!(error);
    }
    Ok(())
}
