//! Check command logic
//!
//! Validates a graph manifest, resolves its dependencies and reports the
//! build order without building anything.

use std::collections::HashSet;

use serde::Serialize;

use crate::core::manifest::GraphManifest;
use crate::core::simulate::Simulation;

/// Result of the check operation
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    /// Whether the graph can be built
    pub valid: bool,
    /// Build order (topologically sorted)
    pub order: Vec<String>,
    /// Why the graph cannot be built
    pub error: Option<String>,
    /// Warnings encountered during check
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl CheckResult {
    /// Create a new check result
    pub fn new() -> Self {
        Self {
            valid: true,
            order: Vec::new(),
            error: None,
            warnings: Vec::new(),
        }
    }

    /// Check if all validations passed
    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

impl Default for CheckResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Perform check operation on a manifest
pub fn check(manifest: &GraphManifest) -> CheckResult {
    let mut result = CheckResult::new();

    if let Err(e) = manifest.validate() {
        result.valid = false;
        result.error = Some(e.to_string());
        return result;
    }

    result.warnings = warnings(manifest);

    let mut simulation = Simulation::from_manifest(manifest);
    match simulation.plan() {
        Ok(order) => {
            result.order = order.iter().map(ToString::to_string).collect();
        }
        Err(e) => {
            result.valid = false;
            result.error = Some(e.to_string());
        }
    }

    result
}

fn warnings(manifest: &GraphManifest) -> Vec<String> {
    let mut warnings = Vec::new();
    let config = &manifest.orchestrator;

    for builder in &manifest.builders {
        let Some(package) = &builder.package else {
            continue;
        };
        if !config.auto_detect {
            warnings.push(format!(
                "Builder '{}' is only discoverable but auto-detection is disabled",
                builder.name
            ));
        } else if !config.packages.contains(package) {
            warnings.push(format!(
                "Builder '{}' is in package '{package}' which is not scanned",
                builder.name
            ));
        }
    }

    let provided: HashSet<&str> = manifest
        .builders
        .iter()
        .flat_map(|b| std::iter::once(&b.name).chain(&b.provides))
        .map(String::as_str)
        .collect();
    for builder in &manifest.builders {
        for dependency in &builder.uses {
            if !provided.contains(dependency.as_str()) {
                warnings.push(format!(
                    "Optional dependency '{dependency}' of '{}' is not provided by any builder",
                    builder.name
                ));
            }
        }
    }

    warnings
}
