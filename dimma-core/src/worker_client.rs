//! Client side of the remote worker protocol
//!
//! Workers expose `POST /execute_task` and answer with a status plus either
//! results or an error string. The transport is behind a trait so tests can
//! substitute canned responses; `HttpWorkerClient` is the production
//! implementation on reqwest.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{DimmaError, DimmaResult};
use crate::types::NodeDescriptor;

/// Request body for `POST /execute_task`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerTaskRequest {
    pub task_id: String,
    pub task_type: String,
    pub input_data: Map<String, Value>,
    pub docker_image: String,
    pub max_execution_time: u64,
}

/// Response body from a worker node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerTaskResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkerTaskResponse {
    pub fn is_completed(&self) -> bool {
        self.status == "Completed"
    }
}

#[async_trait]
pub trait WorkerClient: Send + Sync {
    /// Dispatch a task payload to a node and return its parsed response.
    /// The response body doubles as the result channel for subtasks.
    async fn execute_task(
        &self,
        node: &NodeDescriptor,
        request: &WorkerTaskRequest,
    ) -> DimmaResult<WorkerTaskResponse>;
}

/// HTTP worker client
///
/// The per-request timeout is the task's execution limit plus a grace period
/// for transfer and queueing on the worker side.
pub struct HttpWorkerClient {
    client: reqwest::Client,
    timeout_grace_secs: u64,
}

impl HttpWorkerClient {
    pub fn new(timeout_grace_secs: u64) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout_grace_secs,
        }
    }
}

#[async_trait]
impl WorkerClient for HttpWorkerClient {
    async fn execute_task(
        &self,
        node: &NodeDescriptor,
        request: &WorkerTaskRequest,
    ) -> DimmaResult<WorkerTaskResponse> {
        let url = format!("{}/execute_task", node.base_url());
        let timeout = Duration::from_secs(request.max_execution_time + self.timeout_grace_secs);

        debug!(
            "Dispatching task '{}' to node '{}' at {}",
            request.task_id, node.id, url
        );

        let response = self
            .client
            .post(&url)
            .timeout(timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| DimmaError::RemoteHttpError {
                node_id: node.id.clone(),
                details: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DimmaError::RemoteHttpError {
                node_id: node.id.clone(),
                details: format!("HTTP {}: {}", status, body),
            });
        }

        response
            .json::<WorkerTaskResponse>()
            .await
            .map_err(|e| DimmaError::RemoteHttpError {
                node_id: node.id.clone(),
                details: format!("malformed response body: {}", e),
            })
    }
}

/// Scripted worker client for tests
///
/// Answers every dispatch through a supplied handler and records the
/// requests it saw, so tests can assert on payload contents and routing.
pub struct MockWorkerClient {
    #[allow(clippy::type_complexity)]
    handler: Box<
        dyn Fn(&NodeDescriptor, &WorkerTaskRequest) -> DimmaResult<WorkerTaskResponse>
            + Send
            + Sync,
    >,
    requests: Mutex<Vec<(String, WorkerTaskRequest)>>,
}

impl MockWorkerClient {
    pub fn new(
        handler: impl Fn(&NodeDescriptor, &WorkerTaskRequest) -> DimmaResult<WorkerTaskResponse>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every dispatch completes with the given results value.
    pub fn completing_with(results: Value) -> Self {
        Self::new(move |_, _| {
            Ok(WorkerTaskResponse {
                status: "Completed".to_string(),
                results: Some(results.clone()),
                error: None,
            })
        })
    }

    /// Every dispatch completes, echoing the request's input mapping back as
    /// its results.
    pub fn echoing_input() -> Self {
        Self::new(|_, request| {
            Ok(WorkerTaskResponse {
                status: "Completed".to_string(),
                results: Some(Value::Object(request.input_data.clone())),
                error: None,
            })
        })
    }

    /// Every dispatch fails at the transport layer with the given detail.
    pub fn failing_with_http(details: impl Into<String>) -> Self {
        let details = details.into();
        Self::new(move |node, _| {
            Err(DimmaError::RemoteHttpError {
                node_id: node.id.clone(),
                details: details.clone(),
            })
        })
    }

    /// Requests seen so far, as `(node_id, request)` pairs in dispatch order.
    pub async fn requests(&self) -> Vec<(String, WorkerTaskRequest)> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl WorkerClient for MockWorkerClient {
    async fn execute_task(
        &self,
        node: &NodeDescriptor,
        request: &WorkerTaskRequest,
    ) -> DimmaResult<WorkerTaskResponse> {
        self.requests
            .lock()
            .await
            .push((node.id.clone(), request.clone()));
        (self.handler)(node, request)
    }
}
