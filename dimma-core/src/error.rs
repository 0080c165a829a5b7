//! Error types for the dispatch engine
//!
//! Execution failures are absorbed at the engine boundary and recorded on the
//! task record as a Failed status; the variants here carry the context that
//! ends up in the logs. The public API only raises for programmer errors
//! such as submitting a task with invalid resource estimates.

use thiserror::Error;

pub type DimmaResult<T> = Result<T, DimmaError>;

#[derive(Error, Debug)]
pub enum DimmaError {
    #[error("no placement for task {task_id}: {reason}")]
    NoPlacement { task_id: String, reason: String },

    #[error("container for task {task_id} exited with status {exit_code}")]
    ContainerNonZero { task_id: String, exit_code: i64 },

    #[error("container for task {task_id} exceeded its {timeout_secs}s deadline")]
    ContainerTimeout { task_id: String, timeout_secs: u64 },

    #[error("task {task_id} produced unparsable output")]
    OutputUnparsable {
        task_id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("dispatch to node {node_id} failed: {details}")]
    RemoteHttpError { node_id: String, details: String },

    #[error("node {node_id} reported task failure: {details}")]
    RemoteReportedFailure { node_id: String, details: String },

    #[error("insufficient local resources: requested {requested}, available {available}")]
    InsufficientResources { requested: String, available: String },

    #[error("invalid input for {field}: {message}")]
    InvalidInput { field: String, message: String },

    #[error("container runtime operation '{operation}' failed: {details}")]
    ContainerRuntime { operation: String, details: String },

    #[error("IO error during {operation}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl DimmaError {
    /// Wrap an IO error with the operation that produced it.
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }
}
