//! Container runtime abstraction
//!
//! This trait defines the contract the local execution path depends on,
//! decoupling the engine from the concrete daemon (Docker via `dimma-docker`,
//! or anything else that can run an image with a bind mount and limits).
//! `MockContainerRuntime` simulates exit codes, outputs and stalls for tests.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{DimmaError, DimmaResult};

/// Mount point at which a task's scratch area is visible inside its container.
pub const DATA_MOUNT: &str = "/data";

/// CPU quota period in microseconds; the quota itself scales with the task's
/// CPU estimate.
pub const CPU_PERIOD_US: i64 = 100_000;

/// Everything the runtime needs to launch one task container.
#[derive(Debug, Clone)]
pub struct ContainerSpec {
    /// Container name, incorporating the task identifier.
    pub name: String,
    pub image: String,
    pub cmd: Vec<String>,
    /// Host-side scratch directory, mounted read-write at [`DATA_MOUNT`].
    pub scratch_dir: PathBuf,
    /// Memory limit in mebibytes.
    pub memory_limit_mb: u64,
    /// CPU quota in microseconds per [`CPU_PERIOD_US`] period.
    pub cpu_quota_us: i64,
}

#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Create and start a container; returns its runtime identifier.
    async fn run_container(&self, spec: &ContainerSpec) -> DimmaResult<String>;

    /// Block until the container exits; returns its exit status.
    async fn wait_container(&self, container_id: &str) -> DimmaResult<i64>;

    /// Terminate a container that overran its deadline.
    async fn kill_container(&self, container_id: &str) -> DimmaResult<()>;

    /// Remove the container and its runtime state.
    async fn remove_container(&self, container_id: &str) -> DimmaResult<()>;
}

/// In-memory container runtime for tests
///
/// Simulates a container that sleeps for a configured duration, optionally
/// writes an output document into the scratch area, and exits with a
/// configured status. Created, killed and removed containers are recorded so
/// tests can assert that cleanup leaves nothing behind.
pub struct MockContainerRuntime {
    exit_code: i64,
    output: Option<String>,
    run_delay: Duration,
    state: Mutex<MockState>,
}

#[derive(Default)]
struct MockState {
    active: HashMap<String, PathBuf>,
    created: Vec<ContainerSpec>,
    killed: Vec<String>,
    removed: Vec<String>,
}

impl MockContainerRuntime {
    /// A container that exits 0 after writing `output` to `output.json`.
    pub fn completing_with(output: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            output: Some(output.into()),
            run_delay: Duration::ZERO,
            state: Mutex::new(MockState::default()),
        }
    }

    /// Like [`completing_with`](Self::completing_with), but the container
    /// runs for `delay` before exiting.
    pub fn completing_after(delay: Duration, output: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            output: Some(output.into()),
            run_delay: delay,
            state: Mutex::new(MockState::default()),
        }
    }

    /// A container that exits with the given non-zero status and no output.
    pub fn exiting_with(exit_code: i64) -> Self {
        Self {
            exit_code,
            output: None,
            run_delay: Duration::ZERO,
            state: Mutex::new(MockState::default()),
        }
    }

    /// A container that keeps running for `delay` before exiting 0; used to
    /// drive the deadline path.
    pub fn stalled_for(delay: Duration) -> Self {
        Self {
            exit_code: 0,
            output: None,
            run_delay: delay,
            state: Mutex::new(MockState::default()),
        }
    }

    /// Specs of every container launched so far, in launch order.
    pub async fn created_containers(&self) -> Vec<ContainerSpec> {
        self.state.lock().await.created.clone()
    }

    pub async fn killed_containers(&self) -> Vec<String> {
        self.state.lock().await.killed.clone()
    }

    pub async fn removed_containers(&self) -> Vec<String> {
        self.state.lock().await.removed.clone()
    }

    /// Containers launched but not yet removed.
    pub async fn active_count(&self) -> usize {
        self.state.lock().await.active.len()
    }
}

#[async_trait]
impl ContainerRuntime for MockContainerRuntime {
    async fn run_container(&self, spec: &ContainerSpec) -> DimmaResult<String> {
        let mut state = self.state.lock().await;
        state.created.push(spec.clone());
        state.active.insert(spec.name.clone(), spec.scratch_dir.clone());
        Ok(spec.name.clone())
    }

    async fn wait_container(&self, container_id: &str) -> DimmaResult<i64> {
        if !self.run_delay.is_zero() {
            tokio::time::sleep(self.run_delay).await;
        }
        if let Some(output) = &self.output {
            let scratch_dir = {
                let state = self.state.lock().await;
                state.active.get(container_id).cloned()
            };
            let scratch_dir = scratch_dir.ok_or_else(|| DimmaError::ContainerRuntime {
                operation: "wait".to_string(),
                details: format!("unknown container {}", container_id),
            })?;
            tokio::fs::write(scratch_dir.join("output.json"), output)
                .await
                .map_err(|e| DimmaError::io("write mock container output", e))?;
        }
        Ok(self.exit_code)
    }

    async fn kill_container(&self, container_id: &str) -> DimmaResult<()> {
        self.state.lock().await.killed.push(container_id.to_string());
        Ok(())
    }

    async fn remove_container(&self, container_id: &str) -> DimmaResult<()> {
        let mut state = self.state.lock().await;
        state.active.remove(container_id);
        state.removed.push(container_id.to_string());
        Ok(())
    }
}
