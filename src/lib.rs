//! Bootgraph - dependency-aware builder orchestration
//!
//! Independent builders declare optional and mandatory dependencies on each
//! other. The [`Orchestrator`](core::orchestrator::Orchestrator) resolves
//! them, builds every builder once in dependency order, drives init/start
//! over the built objects and can tear everything down and rebuild it.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`cli`] - Command-line interface parsing and output formatting
//! - [`core`] - Orchestration logic (no terminal output)
//! - [`config`] - Configuration and constants
//! - [`error`] - Error types and handling

pub mod cli;
pub mod config;
pub mod core;
pub mod error;

pub use crate::core::builder::Builder;
pub use crate::core::dependency::DependencySpec;
pub use crate::core::dependent::{Blueprint, DependentBuilder};
pub use crate::core::key::TypeKey;
pub use crate::core::lifecycle::Lifecycle;
pub use crate::core::orchestrator::Orchestrator;
pub use crate::core::registry::{Built, BuiltRegistry};
pub use crate::error::BootError;

#[cfg(test)]
pub mod test_utils;
