//! CLI command implementations
//!
//! Each command is implemented in its own submodule.

pub mod check;
pub mod run;

use std::path::PathBuf;

use anyhow::Result;
use clap::Subcommand;

use crate::config::defaults::GRAPH_MANIFEST_FILE;

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate a builder graph and print its build order
    Check {
        /// Graph manifest to check
        #[arg(default_value = GRAPH_MANIFEST_FILE)]
        manifest: PathBuf,
    },

    /// Build a simulated builder graph and print what happened
    Run {
        /// Graph manifest to run
        #[arg(default_value = GRAPH_MANIFEST_FILE)]
        manifest: PathBuf,

        /// Rebuild once after the initial build
        #[arg(long)]
        rebuild: bool,
    },
}

impl Commands {
    /// Execute the command
    pub fn run(self) -> Result<()> {
        match self {
            Self::Check { manifest } => check::execute(&manifest),
            Self::Run { manifest, rebuild } => run::execute(&manifest, rebuild),
        }
    }
}
