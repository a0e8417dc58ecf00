//! Error types for bootgraph
//!
//! Domain-specific error types using thiserror.

use thiserror::Error;

use crate::core::dependency::SweepPhase;
use crate::core::lifecycle::LifecyclePhase;

/// Boxed error produced by user code (blueprints, lifecycle hooks, discovery)
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependency resolution errors
#[derive(Error, Debug)]
pub enum ResolverError {
    /// A required dependency has no registered match
    #[error("Missing required dependency: '{dependency}' required by '{dependent}'")]
    MissingRequiredDependency { dependent: String, dependency: String },

    /// Builders that could not be placed in the build order
    #[error("Circular dependency detected among builders: {}", builders.join(", "))]
    CircularDependency { builders: Vec<String> },
}

/// Dependency slot access errors
///
/// These guard programming errors: reading a slot in a state where the
/// requested part does not exist.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DependencyError {
    /// Slot has no built value
    #[error("Dependency is not ready: {dependency}")]
    NotReady { dependency: String },

    /// Slot has never been matched to a builder
    #[error("Builder not yet provided for: {dependency}")]
    NotProvided { dependency: String },
}

/// Errors raised while a builder builds
#[derive(Error, Debug)]
pub enum BuildError {
    /// A required slot was matched but its builder never produced a value
    #[error("Required dependency '{dependency}' of '{dependent}' not ready during {phase} phase")]
    DependencyNotReady {
        dependent: String,
        dependency: String,
        phase: SweepPhase,
    },

    /// The builder's own construction logic failed
    #[error("Build failed for builder '{builder}': {source}")]
    Failed {
        builder: String,
        #[source]
        source: BoxError,
    },
}

impl BuildError {
    /// Wrap a failure raised by the named builder
    pub fn failed(builder: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Failed {
            builder: builder.into(),
            source: source.into(),
        }
    }

    /// Name of the builder the error is attributed to
    pub fn builder(&self) -> &str {
        match self {
            Self::DependencyNotReady { dependent, .. } => dependent,
            Self::Failed { builder, .. } => builder,
        }
    }
}

/// Errors returned by lifecycle implementations
#[derive(Error, Debug)]
pub enum LifecycleError {
    /// `init` called twice without an intervening `stop`
    #[error("Lifecycle already initialized")]
    AlreadyInitialized,

    /// `start` or `stop` called before `init`
    #[error("Lifecycle not initialized")]
    NotInitialized,

    /// `start` called twice without an intervening `stop`
    #[error("Lifecycle already started")]
    AlreadyStarted,

    /// `flush` called on something that is not stopped
    #[error("Lifecycle not stopped")]
    NotStopped,

    /// Failure raised by the managed object itself
    #[error("{0}")]
    Failed(BoxError),
}

impl LifecycleError {
    /// Wrap an arbitrary failure
    pub fn failed(source: impl Into<BoxError>) -> Self {
        Self::Failed(source.into())
    }
}

/// Discovery collaborator errors
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// Scanning a package failed
    #[error("Failed to scan package '{package}': {reason}")]
    ScanFailed { package: String, reason: String },

    /// Any other discovery failure
    #[error("Discovery failed: {0}")]
    Other(BoxError),
}

/// Configuration file errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file '{path}': {error}")]
    Read { path: String, error: String },

    /// Failed to parse config file
    #[error("Failed to parse config file '{path}': {error}")]
    Parse { path: String, error: String },
}

/// Graph manifest errors
#[derive(Error, Debug)]
pub enum ManifestError {
    /// Manifest file not found
    #[error("Graph manifest not found at '{path}'")]
    NotFound { path: String },

    /// Failed to read the manifest
    #[error("Failed to read graph manifest '{path}': {error}")]
    Read { path: String, error: String },

    /// Failed to parse the manifest
    #[error("Failed to parse graph manifest: {0}")]
    Parse(String),

    /// Manifest parsed but is not valid
    #[error("Invalid graph manifest: {}", problems.join("; "))]
    Invalid { problems: Vec<String> },
}

/// Top-level bootgraph error type
#[derive(Error, Debug)]
pub enum BootError {
    /// Resolve or sort failure
    #[error("Resolver error: {0}")]
    Resolver(#[from] ResolverError),

    /// Builder failure
    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    /// Lifecycle failure on a built object
    #[error("Failed to {phase} lifecycle object '{object}': {source}")]
    Lifecycle {
        object: String,
        phase: LifecyclePhase,
        #[source]
        source: LifecycleError,
    },

    /// Discovery failure (strict discovery only)
    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    /// `rebuild()` called without a previous successful `build()`
    #[error("Cannot rebuild before an initial build() has succeeded")]
    NotBuilt,

    /// Configuration error
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Graph manifest error
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circular_dependency_lists_builders() {
        let err = ResolverError::CircularDependency {
            builders: vec!["A".to_string(), "B".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Circular dependency detected among builders: A, B"
        );
    }

    #[test]
    fn test_build_error_names_builder() {
        let err = BuildError::failed("Cache", "disk full");
        assert_eq!(err.builder(), "Cache");
        assert!(err.to_string().contains("disk full"));

        let err = BuildError::DependencyNotReady {
            dependent: "Api".to_string(),
            dependency: "Db".to_string(),
            phase: SweepPhase::PreBuild,
        };
        assert_eq!(err.builder(), "Api");
        assert!(err.to_string().contains("pre-build"));
    }

    #[test]
    fn test_lifecycle_error_message() {
        let err = BootError::Lifecycle {
            object: "Server".to_string(),
            phase: LifecyclePhase::Start,
            source: LifecycleError::failed("port in use"),
        };
        assert_eq!(
            err.to_string(),
            "Failed to start lifecycle object 'Server': port in use"
        );
    }
}
