//! Bootgraph CLI - dependency-aware builder orchestration
//!
//! Entry point for the bootgraph command-line application.

use anyhow::Result;
use clap::Parser;

use bootgraph::cli::output::{display_error, OutputConfig};
use bootgraph::cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Apply output configuration globally
    let output_config = OutputConfig::new(cli.quiet, cli.json, cli.verbose);
    output_config.apply_global();

    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(output_config.env_filter())
        .with_writer(std::io::stderr)
        .init();

    // Run the command and handle errors
    match cli.run() {
        Ok(()) => Ok(()),
        Err(e) => {
            display_error(&e);
            std::process::exit(1);
        }
    }
}
