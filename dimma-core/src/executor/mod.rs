//! Execution engine
//!
//! Runs a placed task to completion: container orchestration for local
//! placements, HTTP dispatch for single-remote, and partition/dispatch/
//! combine for splits. All failures surface as errors to the engine, which
//! records them as the task's Failed state.

pub mod distributed;
pub mod local;
pub mod remote;

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;

use crate::catalog::TaskCatalog;
use crate::container::ContainerRuntime;
use crate::error::DimmaResult;
use crate::scheduler::Placement;
use crate::types::Task;
use crate::worker_client::{WorkerClient, WorkerTaskRequest};

pub struct TaskExecutor {
    runtime: Arc<dyn ContainerRuntime>,
    workers: Arc<dyn WorkerClient>,
    catalog: Arc<TaskCatalog>,
    scratch_root: PathBuf,
}

impl TaskExecutor {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        workers: Arc<dyn WorkerClient>,
        catalog: Arc<TaskCatalog>,
        scratch_root: PathBuf,
    ) -> Self {
        Self {
            runtime,
            workers,
            catalog,
            scratch_root,
        }
    }

    /// Run the task according to its placement and return the result value.
    pub async fn execute(&self, task: &Task, placement: &Placement) -> DimmaResult<Value> {
        match placement {
            Placement::Local => self.run_local(task).await,
            Placement::Remote(node) => self.run_remote(task, node).await,
            Placement::Split(nodes) => self.run_split(task, nodes).await,
        }
    }

    /// Build the wire payload for dispatching (a shard of) a task to a node.
    fn worker_request(
        &self,
        task: &Task,
        task_id: String,
        input_data: serde_json::Map<String, Value>,
    ) -> WorkerTaskRequest {
        WorkerTaskRequest {
            task_id,
            task_type: task.task_type.clone(),
            input_data,
            docker_image: self.catalog.image_for(&task.task_type).to_string(),
            max_execution_time: task.max_execution_time,
        }
    }
}
