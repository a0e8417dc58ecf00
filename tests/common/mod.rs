//! Common test utilities and helpers
//!
//! This module provides shared utilities for integration tests.

use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Test project context
///
/// Creates a temporary directory holding graph manifests and runs the
/// bootgraph binary against it.
pub struct TestProject {
    /// Temporary directory for the test project
    pub dir: TempDir,
}

impl TestProject {
    /// Create a new test project in a temporary directory
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Get the path to the test project directory
    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Create a file in the test project
    pub fn create_file(&self, name: &str, content: &str) {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(path, content).expect("Failed to write file");
    }

    /// Run bootgraph with arguments in the project directory
    #[allow(dead_code)]
    pub fn run(&self, args: &[&str]) -> Output {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_bootgraph"));
        cmd.current_dir(self.path());
        cmd.env_remove("RUST_LOG");
        for arg in args {
            cmd.arg(arg);
        }
        cmd.output().expect("Failed to execute bootgraph")
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

/// Stdout of a finished command
#[allow(dead_code)]
pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Stderr of a finished command
#[allow(dead_code)]
pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// A web service on top of a database, with an optional cache
#[allow(dead_code)]
pub const SERVICE_GRAPH: &str = r#"
[[builder]]
name = "web"
requires = ["storage"]
uses = ["cache"]
lifecycle = true

[[builder]]
name = "database"
provides = ["storage"]
lifecycle = true
rebuildable = true

[[builder]]
name = "config"
"#;

/// A graph whose only builder requires something nobody provides
#[allow(dead_code)]
pub const MISSING_GRAPH: &str = r#"
[[builder]]
name = "consumer"
requires = ["producer"]
"#;

/// Two builders requiring each other
#[allow(dead_code)]
pub const CYCLE_GRAPH: &str = r#"
[[builder]]
name = "left"
requires = ["right"]

[[builder]]
name = "right"
requires = ["left"]
"#;

/// A plugin that is only registered through discovery
#[allow(dead_code)]
pub const DISCOVERY_GRAPH: &str = r#"
[orchestrator]
auto_detect = true
packages = ["app.plugins"]

[[builder]]
name = "host"
requires = ["plugin"]
lifecycle = true

[[builder]]
name = "plugin"
package = "app.plugins"
lifecycle = true
"#;
