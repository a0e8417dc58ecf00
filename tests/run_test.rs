//! Integration tests for `bootgraph run`
//!
//! - Builds in dependency order and starts lifecycle objects
//! - Rebuild stops objects in reverse order and refreshes rebuildable ones
//! - Discovery registers packaged builders when auto-detection is on
//! - Failures exit with status 1

mod common;

use common::{
    stderr, stdout, TestProject, DISCOVERY_GRAPH, MISSING_GRAPH, SERVICE_GRAPH,
};
use serde_json::Value;

fn events(run: &Value) -> Vec<String> {
    run["events"]
        .as_array()
        .expect("events array")
        .iter()
        .map(|e| {
            let kind = e["event"].as_str().unwrap_or_default();
            let subject = e["builder"].as_str().or(e["object"].as_str()).unwrap_or_default();
            match e["dependency"].as_str() {
                Some(dependency) => format!("{kind} {subject} <- {dependency}"),
                None => format!("{kind} {subject}"),
            }
        })
        .collect()
}

fn run_json(project: &TestProject, args: &[&str]) -> (std::process::Output, Value) {
    let mut full = vec!["--json", "run"];
    full.extend_from_slice(args);
    let output = project.run(&full);
    let json = serde_json::from_slice(&output.stdout).expect("valid JSON");
    (output, json)
}

#[test]
fn test_run_builds_and_starts_in_order() {
    let project = TestProject::new();
    project.create_file("graph.toml", SERVICE_GRAPH);

    let (output, json) = run_json(&project, &[]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(
        events(&json["build"]),
        vec![
            "build database",
            "build config",
            "pre-build web <- storage",
            "build web",
            "post-build web <- storage",
            "init database",
            "start database",
            "init web",
            "start web",
        ]
    );
    assert_eq!(
        json["build"]["order"],
        serde_json::json!(["database", "config", "web"])
    );
    assert!(json.get("rebuild").is_none());
}

#[test]
fn test_run_reports_objects() {
    let project = TestProject::new();
    project.create_file("graph.toml", SERVICE_GRAPH);

    let (_, json) = run_json(&project, &[]);

    let objects = json["build"]["objects"].as_array().unwrap();
    assert_eq!(objects.len(), 3);
    let config = objects.iter().find(|o| o["name"] == "config").unwrap();
    assert_eq!(config["managed"], false);
    assert_eq!(config["generation"], 0);
}

#[test]
fn test_run_rebuild() {
    let project = TestProject::new();
    project.create_file("graph.toml", SERVICE_GRAPH);

    let (output, json) = run_json(&project, &["--rebuild"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(
        events(&json["rebuild"]),
        vec![
            "stop web",
            "stop database",
            "build database",
            "init database",
            "start database",
            "init web",
            "start web",
        ]
    );

    let objects = json["rebuild"]["objects"].as_array().unwrap();
    let generation = |name: &str| {
        objects
            .iter()
            .find(|o| o["name"] == name)
            .map(|o| o["generation"].clone())
            .unwrap()
    };
    assert_eq!(generation("database"), 1);
    assert_eq!(generation("web"), 0);
}

#[test]
fn test_run_with_discovery() {
    let project = TestProject::new();
    project.create_file("graph.toml", DISCOVERY_GRAPH);

    let (output, json) = run_json(&project, &[]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(json["build"]["order"], serde_json::json!(["plugin", "host"]));
}

#[test]
fn test_run_missing_dependency_builds_nothing() {
    let project = TestProject::new();
    project.create_file("graph.toml", MISSING_GRAPH);

    let (output, json) = run_json(&project, &[]);

    assert_eq!(output.status.code(), Some(1));
    assert!(events(&json["build"]).is_empty());
    assert!(json["build"]["error"]
        .as_str()
        .unwrap()
        .contains("Missing required dependency"));
}

#[test]
fn test_run_start_failure() {
    let project = TestProject::new();
    project.create_file(
        "graph.toml",
        r#"
[[builder]]
name = "server"
lifecycle = true
fail = "start"
"#,
    );

    let output = project.run(&["run"]);

    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(
        err.contains("Failed to start lifecycle object 'server'"),
        "stderr: {err}"
    );
    assert!(stdout(&output).contains("no registry was published"));
}

#[test]
fn test_run_stop_failure_does_not_abort_rebuild() {
    let project = TestProject::new();
    project.create_file(
        "graph.toml",
        r#"
[[builder]]
name = "server"
lifecycle = true
rebuildable = true
fail = "stop"
"#,
    );

    let (output, json) = run_json(&project, &["--rebuild"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(
        events(&json["rebuild"]),
        vec!["stop server", "build server", "init server", "start server"]
    );
}

#[test]
fn test_run_failed_rebuild_keeps_initial_registry() {
    let project = TestProject::new();
    // Not rebuildable and never stops, so the restart cannot init it again
    project.create_file(
        "graph.toml",
        r#"
[[builder]]
name = "server"
lifecycle = true
fail = "stop"
"#,
    );

    let output = project.run(&["run", "--rebuild"]);

    assert_eq!(output.status.code(), Some(1));
    let out = stdout(&output);
    assert!(out.contains("Built 1 objects"), "stdout: {out}");
    assert!(
        out.contains("Rebuild aborted, the registry from the initial build is still current"),
        "stdout: {out}"
    );
    assert!(!out.contains("no registry was published"));
    assert!(stderr(&output).contains("Lifecycle already initialized"));
}

#[test]
fn test_run_human_output() {
    let project = TestProject::new();
    project.create_file("graph.toml", SERVICE_GRAPH);

    let output = project.run(&["run", "--rebuild"]);

    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("Built 3 objects"));
    assert!(out.contains("Rebuilt 3 objects"));
    assert!(out.contains("database (generation 1) [lifecycle]"));
}

#[test]
fn test_run_verbose_logs_to_stderr() {
    let project = TestProject::new();
    project.create_file("graph.toml", SERVICE_GRAPH);

    let output = project.run(&["-v", "run"]);

    assert!(output.status.success());
    assert!(stderr(&output).contains("Built 3 objects in"));
}
