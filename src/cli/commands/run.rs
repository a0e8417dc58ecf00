//! Run command implementation
//!
//! Implements `bootgraph run` to build a simulated graph, optionally rebuild
//! it, and report every build and lifecycle step.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::cli::output::{is_json, print_detail, print_heading, print_info, print_success};
use crate::core::manifest::GraphManifest;
use crate::core::registry::{Built, BuiltRegistry};
use crate::core::simulate::{Event, SimulatedObject, Simulation};
use crate::error::BootError;

/// One run (build or rebuild) as reported to the user
#[derive(Debug, Serialize)]
struct RunReport {
    order: Vec<String>,
    events: Vec<Event>,
    objects: Vec<ObjectReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct ObjectReport {
    name: String,
    managed: bool,
    generation: Option<usize>,
}

impl ObjectReport {
    fn from_built(built: &Built) -> Self {
        Self {
            name: built.key().to_string(),
            managed: built.is_managed(),
            generation: built
                .downcast::<SimulatedObject>()
                .map(|object| object.generation()),
        }
    }
}

#[derive(Debug, Default, Serialize)]
struct Report {
    build: Option<RunReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rebuild: Option<RunReport>,
}

fn report(simulation: &Simulation, result: &Result<BuiltRegistry, BootError>) -> RunReport {
    let events = simulation.log().drain();
    match result {
        Ok(registry) => RunReport {
            order: simulation
                .orchestrator()
                .build_order()
                .iter()
                .map(ToString::to_string)
                .collect(),
            events,
            objects: registry.all().map(ObjectReport::from_built).collect(),
            error: None,
        },
        Err(e) => RunReport {
            order: Vec::new(),
            events,
            objects: Vec::new(),
            error: Some(e.to_string()),
        },
    }
}

fn print_run(title: &str, run: &RunReport) {
    print_heading(&format!("{title}:"));
    for event in &run.events {
        print_detail(&event.to_string());
    }
    if run.error.is_some() {
        return;
    }

    print_heading("Objects:");
    if run.objects.is_empty() {
        print_detail("(none)");
    }
    for object in &run.objects {
        let mut line = format!("• {}", object.name);
        if let Some(generation) = object.generation {
            line.push_str(&format!(" (generation {generation})"));
        }
        if object.managed {
            line.push_str(" [lifecycle]");
        }
        print_detail(&line);
    }
}

/// Execute the run command
pub fn execute(manifest_path: &Path, rebuild: bool) -> Result<()> {
    let manifest = GraphManifest::load(manifest_path)
        .with_context(|| format!("Failed to load {}", manifest_path.display()))?;

    tracing::info!(
        "Running graph {} ({} builders)",
        manifest_path.display(),
        manifest.builders.len()
    );

    let mut simulation = Simulation::from_manifest(&manifest);
    let mut output = Report::default();

    let built = simulation.build();
    let run = report(&simulation, &built);
    if !is_json() {
        print_run("Build", &run);
    }
    output.build = Some(run);

    let mut result = built.map(|registry| {
        print_success(&format!("Built {} objects", registry.size()));
    });

    if rebuild && result.is_ok() {
        let rebuilt = simulation.rebuild();
        let run = report(&simulation, &rebuilt);
        if !is_json() {
            print_run("Rebuild", &run);
        }
        output.rebuild = Some(run);

        result = rebuilt.map(|registry| {
            print_success(&format!("Rebuilt {} objects", registry.size()));
        });
    }

    if is_json() {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if result.is_err() {
        if output.rebuild.is_some() {
            print_info("Rebuild aborted, the registry from the initial build is still current");
        } else {
            print_info("Run aborted, no registry was published");
        }
    }

    result.context("Graph run failed")
}
