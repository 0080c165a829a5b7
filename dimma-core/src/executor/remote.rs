//! Single-remote execution: dispatch the whole task to one node

use serde_json::Value;
use tracing::info;

use crate::error::{DimmaError, DimmaResult};
use crate::types::{NodeDescriptor, Task};

impl super::TaskExecutor {
    pub(super) async fn run_remote(&self, task: &Task, node: &NodeDescriptor) -> DimmaResult<Value> {
        let request = self.worker_request(task, task.id.clone(), task.input.clone());
        let response = self.workers.execute_task(node, &request).await?;

        if !response.is_completed() {
            return Err(DimmaError::RemoteReportedFailure {
                node_id: node.id.clone(),
                details: response
                    .error
                    .unwrap_or_else(|| format!("worker reported status '{}'", response.status)),
            });
        }

        info!("Task '{}' completed on node '{}'", task.id, node.id);
        Ok(response.results.unwrap_or(Value::Null))
    }
}
