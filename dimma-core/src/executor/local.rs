//! Local execution: one task, one container, one scratch area
//!
//! The scratch area carries the input payload into the container and the
//! output document back out. Teardown of the container and the scratch area
//! runs on every exit path; a teardown failure is logged and never masks
//! the primary outcome.

use std::path::Path;
use std::time::Duration;

use serde_json::Value;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::container::{ContainerSpec, CPU_PERIOD_US, DATA_MOUNT};
use crate::error::{DimmaError, DimmaResult};
use crate::types::Task;

impl super::TaskExecutor {
    pub(super) async fn run_local(&self, task: &Task) -> DimmaResult<Value> {
        let scratch_dir = self.scratch_root.join(format!("task-{}", task.id));
        tokio::fs::create_dir_all(&scratch_dir)
            .await
            .map_err(|e| DimmaError::io("create scratch area", e))?;

        let outcome = self.run_in_container(task, &scratch_dir).await;

        if let Err(e) = tokio::fs::remove_dir_all(&scratch_dir).await {
            warn!(
                "Failed to remove scratch area for task '{}': {}",
                task.id, e
            );
        }

        outcome
    }

    async fn run_in_container(&self, task: &Task, scratch_dir: &Path) -> DimmaResult<Value> {
        let input = serde_json::to_vec(&task.input).map_err(|e| DimmaError::Internal {
            message: format!("failed to serialize input payload: {}", e),
        })?;
        tokio::fs::write(scratch_dir.join("input.json"), input)
            .await
            .map_err(|e| DimmaError::io("write input payload", e))?;

        let spec = ContainerSpec {
            name: format!("dimma-task-{}", task.id),
            image: self.catalog.image_for(&task.task_type).to_string(),
            cmd: vec![
                "python".to_string(),
                "/app/run.py".to_string(),
                "--input".to_string(),
                format!("{}/input.json", DATA_MOUNT),
                "--output".to_string(),
                format!("{}/output.json", DATA_MOUNT),
            ],
            scratch_dir: scratch_dir.to_path_buf(),
            memory_limit_mb: (task.resources.ram_gb * 1024.0) as u64,
            cpu_quota_us: (task.resources.cpu_cores * CPU_PERIOD_US as f64) as i64,
        };

        info!(
            "Launching container '{}' (image '{}') for task '{}'",
            spec.name, spec.image, task.id
        );
        let container_id = self.runtime.run_container(&spec).await?;

        let waited = self.wait_with_deadline(task, &container_id).await;

        if let Err(e) = self.runtime.remove_container(&container_id).await {
            warn!(
                "Failed to remove container '{}' for task '{}': {}",
                container_id, task.id, e
            );
        }

        let exit_code = waited?;
        if exit_code != 0 {
            return Err(DimmaError::ContainerNonZero {
                task_id: task.id.clone(),
                exit_code,
            });
        }

        let raw = tokio::fs::read(scratch_dir.join("output.json"))
            .await
            .map_err(|e| DimmaError::io("read output document", e))?;
        serde_json::from_slice(&raw).map_err(|e| DimmaError::OutputUnparsable {
            task_id: task.id.clone(),
            source: e,
        })
    }

    /// Wait for the container to exit within the task's wall-clock limit;
    /// on overrun the container is terminated and the task fails.
    async fn wait_with_deadline(&self, task: &Task, container_id: &str) -> DimmaResult<i64> {
        let deadline = Duration::from_secs(task.max_execution_time);
        match timeout(deadline, self.runtime.wait_container(container_id)).await {
            Ok(exit) => exit,
            Err(_) => {
                warn!(
                    "Task '{}' exceeded its {}s deadline, terminating container '{}'",
                    task.id, task.max_execution_time, container_id
                );
                if let Err(e) = self.runtime.kill_container(container_id).await {
                    warn!("Failed to kill container '{}': {}", container_id, e);
                }
                Err(DimmaError::ContainerTimeout {
                    task_id: task.id.clone(),
                    timeout_secs: task.max_execution_time,
                })
            }
        }
    }
}
