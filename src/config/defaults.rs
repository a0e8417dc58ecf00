//! Default configuration values

/// Auto-detection is off unless requested
pub const DEFAULT_AUTO_DETECT: bool = false;

/// Discovery failures are logged, not fatal
pub const DEFAULT_STRICT_DISCOVERY: bool = false;

/// Default graph manifest file name
pub const GRAPH_MANIFEST_FILE: &str = "graph.toml";

/// Default orchestrator config file name
pub const CONFIG_FILE: &str = "bootgraph.toml";

/// Log filter used when `RUST_LOG` is not set
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Minimum proptest iterations
pub const MIN_PROPTEST_ITERATIONS: u32 = 100;
