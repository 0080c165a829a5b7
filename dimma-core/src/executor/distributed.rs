//! Distributed execution: partition, dispatch, combine
//!
//! The input mapping is partitioned key-wise into contiguous chunks, one
//! per chosen node; each chunk travels as a subtask using the same wire
//! protocol as single-remote dispatch, and the per-shard results are
//! combined in index order. Any subtask failure fails the parent.

use futures::future::join_all;
use serde_json::{Map, Value};
use tracing::info;

use crate::error::{DimmaError, DimmaResult};
use crate::types::{NodeDescriptor, Task};

impl super::TaskExecutor {
    pub(super) async fn run_split(
        &self,
        task: &Task,
        nodes: &[NodeDescriptor],
    ) -> DimmaResult<Value> {
        let chunks = partition_input(&task.input, nodes.len());

        let dispatches = nodes.iter().zip(chunks).enumerate().map(|(i, (node, chunk))| {
            let request = self.worker_request(task, format!("{}-{}", task.id, i), chunk);
            async move {
                let response = self.workers.execute_task(node, &request).await?;
                if !response.is_completed() {
                    return Err(DimmaError::RemoteReportedFailure {
                        node_id: node.id.clone(),
                        details: response.error.unwrap_or_else(|| {
                            format!("subtask '{}' reported status '{}'", request.task_id, response.status)
                        }),
                    });
                }
                Ok(response.results.unwrap_or(Value::Null))
            }
        });

        let mut shards = Vec::with_capacity(nodes.len());
        for outcome in join_all(dispatches).await {
            shards.push(outcome?);
        }

        info!(
            "Task '{}' combined {} shard results",
            task.id,
            shards.len()
        );
        Ok(self.catalog.combine(&task.task_type, shards))
    }
}

/// Partition an ordered input mapping into `shards` contiguous chunks of
/// `⌊len/shards⌋` keys, the final chunk absorbing the remainder.
pub fn partition_input(input: &Map<String, Value>, shards: usize) -> Vec<Map<String, Value>> {
    let keys: Vec<&String> = input.keys().collect();
    let base = keys.len() / shards;

    let mut chunks = Vec::with_capacity(shards);
    for i in 0..shards {
        let start = i * base;
        let end = if i == shards - 1 { keys.len() } else { start + base };
        let mut chunk = Map::new();
        for key in &keys[start..end] {
            chunk.insert((*key).clone(), input[*key].clone());
        }
        chunks.push(chunk);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::catalog::TaskCatalog;
    use crate::container::MockContainerRuntime;
    use crate::executor::TaskExecutor;
    use crate::types::ResourceEstimate;
    use crate::worker_client::MockWorkerClient;

    fn input_of(keys: &[(&str, i64)]) -> Map<String, Value> {
        let mut map = Map::new();
        for (k, v) in keys {
            map.insert(k.to_string(), json!(v));
        }
        map
    }

    fn node(id: &str) -> NodeDescriptor {
        NodeDescriptor {
            id: id.to_string(),
            host: "10.0.0.1".to_string(),
            port: 8000,
            capacity: ResourceEstimate::new(2.0, 4.0, 0.0),
            active: true,
        }
    }

    fn executor(workers: Arc<MockWorkerClient>) -> TaskExecutor {
        TaskExecutor::new(
            Arc::new(MockContainerRuntime::exiting_with(1)),
            workers,
            Arc::new(TaskCatalog::default()),
            std::env::temp_dir(),
        )
    }

    fn split_task(input: Map<String, Value>) -> Task {
        Task::new(
            "text_analysis",
            input,
            ResourceEstimate::new(3.0, 6.0, 0.0),
            true,
            30,
        )
    }

    #[test]
    fn test_even_partition() {
        let input = input_of(&[("a", 1), ("b", 2), ("c", 3), ("d", 4)]);
        let chunks = partition_input(&input, 2);
        assert_eq!(chunks.len(), 2);
        assert_eq!(
            chunks[0].keys().collect::<Vec<_>>(),
            vec!["a", "b"]
        );
        assert_eq!(
            chunks[1].keys().collect::<Vec<_>>(),
            vec!["c", "d"]
        );
    }

    #[test]
    fn test_final_chunk_absorbs_remainder() {
        let input = input_of(&[("a", 1), ("b", 2), ("c", 3), ("d", 4), ("e", 5)]);
        let chunks = partition_input(&input, 2);
        assert_eq!(chunks[0].len(), 2);
        assert_eq!(
            chunks[1].keys().collect::<Vec<_>>(),
            vec!["c", "d", "e"]
        );
    }

    #[test]
    fn test_fewer_keys_than_shards() {
        let input = input_of(&[("a", 1)]);
        let chunks = partition_input(&input, 3);
        assert_eq!(chunks.len(), 3);
        assert!(chunks[0].is_empty());
        assert!(chunks[1].is_empty());
        assert_eq!(chunks[2].keys().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn test_partition_preserves_key_set() {
        let input = input_of(&[("a", 1), ("b", 2), ("c", 3), ("d", 4), ("e", 5), ("f", 6), ("g", 7)]);
        let chunks = partition_input(&input, 3);

        let mut seen: Vec<&String> = chunks.iter().flat_map(|c| c.keys()).collect();
        let mut expected: Vec<&String> = input.keys().collect();
        seen.sort();
        expected.sort();
        assert_eq!(seen, expected);
    }

    #[tokio::test]
    async fn test_subtasks_carry_slices_and_combine_in_order() {
        let workers = Arc::new(MockWorkerClient::echoing_input());
        let executor = executor(workers.clone());
        let task = split_task(input_of(&[("a", 1), ("b", 2), ("c", 3), ("d", 4)]));
        let nodes = vec![node("n1"), node("n2")];

        let result = executor.run_split(&task, &nodes).await.unwrap();
        assert_eq!(result, json!([{"a": 1, "b": 2}, {"c": 3, "d": 4}]));

        let requests = workers.requests().await;
        assert_eq!(requests.len(), 2);
        let by_subtask: Vec<_> = {
            let mut rs = requests.clone();
            rs.sort_by(|a, b| a.1.task_id.cmp(&b.1.task_id));
            rs
        };
        assert_eq!(by_subtask[0].1.task_id, format!("{}-0", task.id));
        assert_eq!(by_subtask[0].0, "n1");
        assert_eq!(by_subtask[1].1.task_id, format!("{}-1", task.id));
        assert_eq!(by_subtask[1].0, "n2");
    }

    #[tokio::test]
    async fn test_any_subtask_failure_fails_the_parent() {
        let workers = Arc::new(MockWorkerClient::new(|node, request| {
            if node.id == "n2" {
                Err(DimmaError::RemoteHttpError {
                    node_id: node.id.clone(),
                    details: "connection refused".to_string(),
                })
            } else {
                Ok(crate::worker_client::WorkerTaskResponse {
                    status: "Completed".to_string(),
                    results: Some(Value::Object(request.input_data.clone())),
                    error: None,
                })
            }
        }));
        let executor = executor(workers);
        let task = split_task(input_of(&[("a", 1), ("b", 2)]));
        let nodes = vec![node("n1"), node("n2")];

        let result = executor.run_split(&task, &nodes).await;
        assert!(matches!(result, Err(DimmaError::RemoteHttpError { .. })));
    }
}
