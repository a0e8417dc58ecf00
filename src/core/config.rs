//! Orchestrator configuration
//!
//! Settings that control a run: whether builders are discovered, what
//! happens when discovery fails, and which packages are scanned. Loaded from
//! a standalone TOML file or from the `[orchestrator]` table of a graph
//! manifest.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::defaults::{DEFAULT_AUTO_DETECT, DEFAULT_STRICT_DISCOVERY};
use crate::error::ConfigError;

/// Orchestrator settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Ask the discovery collaborator for builders on every run
    pub auto_detect: bool,

    /// Abort the run when discovery fails instead of continuing without
    /// discovered builders
    pub strict_discovery: bool,

    /// Packages handed to discovery and to packageable builders
    pub packages: Vec<String>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            auto_detect: DEFAULT_AUTO_DETECT,
            strict_discovery: DEFAULT_STRICT_DISCOVERY,
            packages: Vec::new(),
        }
    }
}

impl OrchestratorConfig {
    /// Parse from TOML text
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load configuration from a file
    ///
    /// A missing file yields the defaults.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;

        Self::from_toml(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            error: e.to_string(),
        })
    }
}
