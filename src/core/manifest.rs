//! Graph manifest parsing and validation
//!
//! A graph manifest (`graph.toml`) describes a builder graph as data: the
//! orchestrator settings plus one `[[builder]]` table per builder. It is
//! turned into real builders by [`crate::core::simulate`].

use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::config::OrchestratorConfig;
use crate::core::lifecycle::LifecyclePhase;
use crate::error::ManifestError;

/// A builder graph described as data
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphManifest {
    /// Orchestrator settings
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    /// Builders in registration order
    #[serde(default, rename = "builder")]
    pub builders: Vec<BuilderSpec>,
}

/// One builder of a graph manifest
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuilderSpec {
    /// Builder name, also the key of the object it builds
    pub name: String,

    /// Additional keys this builder satisfies
    #[serde(default)]
    pub provides: Vec<String>,

    /// Mandatory dependencies
    #[serde(default)]
    pub requires: Vec<String>,

    /// Optional dependencies
    #[serde(default)]
    pub uses: Vec<String>,

    /// Whether the built object takes part in init/start/stop
    #[serde(default)]
    pub lifecycle: bool,

    /// Whether a rebuild produces a fresh object
    #[serde(default)]
    pub rebuildable: bool,

    /// Step at which the builder or its object fails
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail: Option<String>,

    /// Package the builder is found in; only discovery registers such builders
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
}

impl BuilderSpec {
    /// Parsed `fail` value; `None` when absent or invalid
    pub fn fail_at(&self) -> Option<FailAt> {
        self.fail.as_deref().and_then(|f| f.parse().ok())
    }
}

/// Step at which a simulated builder fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    Build,
    Init,
    Start,
    Stop,
}

impl FailAt {
    /// Lifecycle phase the failure applies to, if any
    pub fn lifecycle_phase(self) -> Option<LifecyclePhase> {
        match self {
            Self::Build => None,
            Self::Init => Some(LifecyclePhase::Init),
            Self::Start => Some(LifecyclePhase::Start),
            Self::Stop => Some(LifecyclePhase::Stop),
        }
    }
}

impl FromStr for FailAt {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "build" => Ok(Self::Build),
            "init" => Ok(Self::Init),
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            other => Err(format!(
                "invalid fail step '{other}' (expected build, init, start or stop)"
            )),
        }
    }
}

impl fmt::Display for FailAt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Build => write!(f, "build"),
            Self::Init => write!(f, "init"),
            Self::Start => write!(f, "start"),
            Self::Stop => write!(f, "stop"),
        }
    }
}

/// Substitute `${VAR}` patterns with environment variable values.
///
/// Unset variables are replaced by the empty string.
///
/// # Examples
/// ```
/// use bootgraph::core::manifest::substitute_env_vars;
///
/// std::env::set_var("BOOTGRAPH_DOC_VAR", "hello");
/// let result = substitute_env_vars("prefix_${BOOTGRAPH_DOC_VAR}_suffix").unwrap();
/// assert_eq!(result, "prefix_hello_suffix");
/// std::env::remove_var("BOOTGRAPH_DOC_VAR");
/// ```
pub fn substitute_env_vars(input: &str) -> Result<String, String> {
    let re =
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").map_err(|e| format!("Invalid regex: {e}"))?;

    let output = re.replace_all(input, |caps: &regex::Captures<'_>| {
        std::env::var(&caps[1]).unwrap_or_default()
    });
    Ok(output.into_owned())
}

/// Recursively substitute environment variables in a TOML value
fn substitute_in_value(value: &mut toml::Value) -> Result<(), String> {
    match value {
        toml::Value::String(s) => {
            *s = substitute_env_vars(s)?;
        }
        toml::Value::Array(arr) => {
            for item in arr.iter_mut() {
                substitute_in_value(item)?;
            }
        }
        toml::Value::Table(table) => {
            for (_, v) in table.iter_mut() {
                substitute_in_value(v)?;
            }
        }
        _ => {}
    }
    Ok(())
}

impl GraphManifest {
    /// Load, substitute and validate a manifest file
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let manifest = Self::read(path)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Load and substitute a manifest file without validating it
    pub fn read(path: &Path) -> Result<Self, ManifestError> {
        if !path.exists() {
            return Err(ManifestError::NotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| ManifestError::Read {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;

        let manifest = Self::from_toml(&content)?;
        tracing::debug!(
            "Loaded graph manifest {} with {} builders",
            path.display(),
            manifest.builders.len()
        );
        Ok(manifest)
    }

    /// Parse TOML text, substituting environment variables in string values
    pub fn from_toml(content: &str) -> Result<Self, ManifestError> {
        let mut value: toml::Value =
            toml::from_str(content).map_err(|e| ManifestError::Parse(e.to_string()))?;
        substitute_in_value(&mut value).map_err(ManifestError::Parse)?;
        value
            .try_into()
            .map_err(|e: toml::de::Error| ManifestError::Parse(e.to_string()))
    }

    /// Check the manifest for problems that parsing cannot catch
    pub fn validate(&self) -> Result<(), ManifestError> {
        let mut problems = Vec::new();
        let mut seen = HashSet::new();

        for builder in &self.builders {
            if builder.name.trim().is_empty() {
                problems.push("builder name must not be empty".to_string());
                continue;
            }
            if !seen.insert(builder.name.as_str()) {
                problems.push(format!("duplicate builder name '{}'", builder.name));
            }
            if let Some(fail) = &builder.fail {
                if let Err(e) = fail.parse::<FailAt>() {
                    problems.push(format!("builder '{}': {e}", builder.name));
                }
            }
            if builder
                .requires
                .iter()
                .chain(&builder.uses)
                .any(|d| d == &builder.name)
            {
                problems.push(format!("builder '{}' depends on itself", builder.name));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ManifestError::Invalid { problems })
        }
    }

    /// Builder named `name`
    pub fn builder(&self, name: &str) -> Option<&BuilderSpec> {
        self.builders.iter().find(|b| b.name == name)
    }
}
