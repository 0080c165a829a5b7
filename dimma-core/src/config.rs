//! Engine configuration
//!
//! Defaults are overridable via `DIMMA_*` environment variables so a
//! deployment can tune capacity and pacing without a rebuild.

use std::env;
use std::path::PathBuf;

use crate::types::ResourceEstimate;

/// Parse an environment variable as a typed value with a default fallback
fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

/// Configuration for the dispatch engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Local capacity the resource ledger starts from
    pub local_capacity: ResourceEstimate,
    /// Maximum number of in-flight tasks
    pub max_concurrent_tasks: usize,
    /// Dispatcher sleep when the queue is empty or the cap is reached, in milliseconds
    pub poll_interval_ms: u64,
    /// Dispatcher sleep after an iteration error, in milliseconds
    pub error_backoff_ms: u64,
    /// Host directory under which per-task scratch areas are created
    pub scratch_root: PathBuf,
    /// Grace added to the HTTP timeout on top of a task's execution limit, in seconds
    pub remote_timeout_grace_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            local_capacity: ResourceEstimate::new(
                env_var_or_default("DIMMA_LOCAL_CPU_CORES", 4.0),
                env_var_or_default("DIMMA_LOCAL_RAM_GB", 8.0),
                env_var_or_default("DIMMA_LOCAL_GPU_UNITS", 0.0),
            ),
            max_concurrent_tasks: env_var_or_default("DIMMA_MAX_CONCURRENT_TASKS", 4),
            poll_interval_ms: env_var_or_default("DIMMA_POLL_INTERVAL_MS", 100),
            error_backoff_ms: env_var_or_default("DIMMA_ERROR_BACKOFF_MS", 1000),
            scratch_root: env::var("DIMMA_SCRATCH_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| env::temp_dir().join("dimma")),
            remote_timeout_grace_secs: env_var_or_default("DIMMA_REMOTE_TIMEOUT_GRACE_SECS", 10),
        }
    }
}

impl EngineConfig {
    /// Configuration with an explicit local capacity, other fields defaulted.
    pub fn with_local_capacity(capacity: ResourceEstimate) -> Self {
        Self {
            local_capacity: capacity,
            ..Self::default()
        }
    }
}
