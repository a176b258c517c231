//! Execution modes and orchestration configuration
//!
//! The execution mode is chosen once per `process()` call; there are no
//! transitions between modes within a single call.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the orchestrator executes the candidate role list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionMode {
    /// Invoke only the highest-ranked candidate and return its response verbatim
    #[default]
    FirstMatch,

    /// Invoke candidates in order on the same context; each role's state
    /// delta is visible to the next
    Sequential,

    /// Invoke all candidates concurrently against independent context
    /// snapshots; results are merged in candidate-list order
    Parallel,

    /// Invoke candidates in order, feeding each response's content forward
    /// as the next input when `next_roles` is set
    Pipeline,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &str {
        match self {
            ExecutionMode::FirstMatch => "first-match",
            ExecutionMode::Sequential => "sequential",
            ExecutionMode::Parallel => "parallel",
            ExecutionMode::Pipeline => "pipeline",
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first-match" => Ok(ExecutionMode::FirstMatch),
            "sequential" => Ok(ExecutionMode::Sequential),
            "parallel" => Ok(ExecutionMode::Parallel),
            "pipeline" => Ok(ExecutionMode::Pipeline),
            other => Err(format!(
                "Unknown execution mode '{}'. Must be one of: first-match, sequential, parallel, pipeline",
                other
            )),
        }
    }
}

/// Per-call orchestration configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationConfig {
    /// Execution strategy for this call
    #[serde(default)]
    pub execution_mode: ExecutionMode,

    /// Explicit role ids to run, in order; bypasses tag/capability filtering
    #[serde(default)]
    pub specific_roles: Vec<String>,

    /// Only roles owning at least one of these tags are candidates
    /// (ignored when `specific_roles` is non-empty)
    #[serde(default)]
    pub required_tags: Vec<String>,

    /// Candidates owning any of these tags are removed, applied last
    #[serde(default)]
    pub excluded_tags: Vec<String>,

    /// Sequential mode only: stop the chain at the first incomplete step
    #[serde(default)]
    pub stop_on_first_failure: bool,

    /// Upper bound on simultaneous executions in Parallel mode
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Per-step wall-clock bound in seconds; an exceeded step is a failed
    /// step, not a crashed call
    #[serde(default = "default_response_timeout_secs")]
    pub response_timeout_secs: u64,
}

fn default_max_concurrency() -> usize {
    4
}

fn default_response_timeout_secs() -> u64 {
    30
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            execution_mode: ExecutionMode::default(),
            specific_roles: Vec::new(),
            required_tags: Vec::new(),
            excluded_tags: Vec::new(),
            stop_on_first_failure: false,
            max_concurrency: default_max_concurrency(),
            response_timeout_secs: default_response_timeout_secs(),
        }
    }
}

impl OrchestrationConfig {
    /// Create a configuration for the given mode with default settings
    pub fn for_mode(mode: ExecutionMode) -> Self {
        Self {
            execution_mode: mode,
            ..Self::default()
        }
    }
}
