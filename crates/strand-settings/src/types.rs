//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` and `#[serde(default)]`,
//! so a partial JSON file only needs the fields it overrides.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Default recursion limit for nested pipeline execution.
pub const DEFAULT_RECURSION_LIMIT: usize = 25;
/// Default iteration budget for the agent control loop.
pub const DEFAULT_MAX_ITERATIONS: usize = 15;
/// Default concurrency for components that batch concurrently.
pub const DEFAULT_BATCH_CONCURRENCY: usize = 5;
/// Default channel capacity between a stream producer and its consumer.
pub const DEFAULT_STREAM_BUFFER: usize = 16;

/// Root settings type.
///
/// Loaded from `~/.strand/settings.json` with defaults applied for
/// missing fields. Environment variables can override specific values.
///
/// ```json
/// {
///   "runnable": { "recursionLimit": 40 },
///   "agent": { "maxIterations": 8 }
/// }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StrandSettings {
    /// Settings schema version.
    pub version: String,
    /// Pipeline execution defaults.
    pub runnable: RunnableSettings,
    /// Agent loop defaults.
    pub agent: AgentSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

impl Default for StrandSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            runnable: RunnableSettings::default(),
            agent: AgentSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl StrandSettings {
    /// Correct values that would make execution impossible.
    ///
    /// Zero limits are raised to 1 with a warning rather than rejected.
    pub fn validate(&mut self) {
        fn at_least_one(val: &mut usize, name: &str) {
            if *val == 0 {
                tracing::warn!("{name} must be at least 1, clamped");
                *val = 1;
            }
        }

        at_least_one(&mut self.runnable.recursion_limit, "recursion_limit");
        at_least_one(&mut self.runnable.batch_concurrency, "batch_concurrency");
        at_least_one(&mut self.runnable.stream_buffer, "stream_buffer");
        at_least_one(&mut self.agent.max_iterations, "max_iterations");
    }
}

/// Pipeline execution defaults.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunnableSettings {
    /// Maximum nesting depth of child runs.
    pub recursion_limit: usize,
    /// Concurrency used by components that batch concurrently when the
    /// per-call config leaves it unset.
    pub batch_concurrency: usize,
    /// Capacity of the producer → consumer channel behind a stream.
    pub stream_buffer: usize,
}

impl Default for RunnableSettings {
    fn default() -> Self {
        Self {
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            batch_concurrency: DEFAULT_BATCH_CONCURRENCY,
            stream_buffer: DEFAULT_STREAM_BUFFER,
        }
    }
}

/// Agent loop defaults.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentSettings {
    /// Planner calls allowed before the loop gives up.
    pub max_iterations: usize,
    /// Feed planner failures back as observations instead of failing.
    pub handle_parsing_errors: bool,
    /// Include the step log in the returned values.
    pub return_intermediate_steps: bool,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            handle_parsing_errors: false,
            return_intermediate_steps: false,
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default level (`trace`, `debug`, `info`, `warn`, `error`).
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
    /// Per-module level overrides, e.g. `{"strand_agent": "debug"}`.
    pub modules: BTreeMap<String, String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            modules: BTreeMap::new(),
        }
    }
}
