//! Core orchestration logic
//!
//! This module contains all orchestration logic for bootgraph. Nothing in
//! here writes to the terminal - that belongs in [`crate::cli`].
//!
//! # Submodules
//!
//! - [`key`] - Type keys identifying builders and built objects
//! - [`builder`] - Builder contract and optional capabilities
//! - [`dependency`] - Dependency declarations and slots
//! - [`dependent`] - Dependent builder base driving a blueprint
//! - [`lifecycle`] - Init/start/stop contract and state guard
//! - [`registry`] - Built objects and the built registry
//! - [`resolver`] - Build order computation
//! - [`discovery`] - Discovery collaborator contract
//! - [`config`] - Orchestrator configuration
//! - [`orchestrator`] - Resolve, sort, build, lifecycle and rebuild
//! - [`manifest`] - Graph manifest parsing and validation
//! - [`simulate`] - Builders simulated from a graph manifest
//! - [`check`] - Graph validation logic

pub mod builder;
pub mod check;
pub mod config;
pub mod dependency;
pub mod dependent;
pub mod discovery;
pub mod key;
pub mod lifecycle;
pub mod manifest;
pub mod orchestrator;
pub mod registry;
pub mod resolver;
pub mod simulate;
