//! # Global pipeline configuration.
//!
//! Provides [`Config`], centralized settings for the supervision pipeline,
//! and [`AnalyzerConfig`] describing how external analyzers are launched.
//!
//! ## Sentinel values
//! - `grace = 0s` → shutdown does not wait; stragglers are reported immediately.
//! - `AnalyzerConfig::debug = true` → `--debug` is appended to analyzer args.

use std::time::Duration;

/// How external analyzer processes are launched.
///
/// The command line mirrors the analyzer contract:
/// `<program> <script> --video_path <link> --lanes <json> [--debug]`.
#[derive(Clone, Debug)]
pub struct AnalyzerConfig {
    /// Interpreter or binary to execute (e.g. `python3`).
    pub program: String,
    /// Script producing occupancy measurements.
    pub occupancy_script: String,
    /// Script producing speed measurements.
    pub speed_script: String,
    /// Pass `--debug` to analyzers.
    pub debug: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            program: "python3".to_string(),
            occupancy_script: "analyzers/occupancy.py".to_string(),
            speed_script: "analyzers/speed_tracker.py".to_string(),
            debug: false,
        }
    }
}

/// Global configuration for the supervision pipeline.
///
/// Defines:
/// - **Composition cadence**: cycle interval and speed-sample freshness window
/// - **Query bounds**: default cap for unbounded store reads
/// - **Shutdown behavior**: subprocess termination grace and runtime grace
/// - **Event system**: bus capacity for event delivery
///
/// ## Field semantics
/// - `compose_interval`: delay between composition cycles per video
/// - `speed_freshness`: maximum age of speed samples eligible for composition
/// - `speed_sample_limit`: pre-filter cap on speed samples fetched per lane
/// - `query_limit`: default cap on unbounded store queries (prevents unbounded
///   result sets under long-running processes)
/// - `grace`: wait applied both when terminating an analyzer subprocess
///   (SIGTERM → wait → SIGKILL) and when draining pipeline tasks on shutdown
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by the bus)
#[derive(Clone, Debug)]
pub struct Config {
    /// Delay between composition cycles.
    pub compose_interval: Duration,
    /// Maximum age of speed samples used by a composition cycle.
    pub speed_freshness: Duration,
    /// Pre-filter cap on speed samples fetched per lane per cycle.
    pub speed_sample_limit: usize,
    /// Default cap on unbounded store queries.
    pub query_limit: usize,
    /// Grace period before escalating to a forced kill / reporting stragglers.
    pub grace: Duration,
    /// Capacity of the event bus broadcast channel ring buffer.
    pub bus_capacity: usize,
    /// Analyzer launch configuration.
    pub analyzers: AnalyzerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            compose_interval: Duration::from_secs(5),
            speed_freshness: Duration::from_secs(60),
            speed_sample_limit: 10,
            query_limit: 1000,
            grace: Duration::from_secs(5),
            bus_capacity: 256,
            analyzers: AnalyzerConfig::default(),
        }
    }
}
