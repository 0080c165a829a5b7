//! Dispatcher background loop
//!
//! Drains the admission queue into the placement engine while the in-flight
//! count stays under the configured cap. The loop never blocks on an
//! individual task; each dequeued task is handed to its own worker.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::engine::{place_and_execute, EngineShared};
use crate::error::{DimmaError, DimmaResult};
use crate::types::TaskStatus;

pub(crate) struct Dispatcher {
    handle: Option<JoinHandle<()>>,
}

impl Dispatcher {
    pub(crate) fn new() -> Self {
        Self { handle: None }
    }

    pub(crate) fn start(&mut self, shared: Arc<EngineShared>) {
        if self.handle.is_some() {
            warn!("Dispatcher is already running");
            return;
        }
        self.handle = Some(tokio::spawn(run_loop(shared)));
    }

    pub(crate) fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            info!("Dispatcher stopped");
        }
    }
}

async fn run_loop(shared: Arc<EngineShared>) {
    info!(
        "Dispatcher started (max {} concurrent tasks)",
        shared.config.max_concurrent_tasks
    );
    let poll_interval = Duration::from_millis(shared.config.poll_interval_ms);
    let error_backoff = Duration::from_millis(shared.config.error_backoff_ms);

    loop {
        match dispatch_next(&shared).await {
            // A task was dequeued; check for more right away.
            Ok(true) => {}
            Ok(false) => tokio::time::sleep(poll_interval).await,
            Err(e) => {
                error!("Dispatcher iteration failed: {}", e);
                tokio::time::sleep(error_backoff).await;
            }
        }
    }
}

/// Pop the head of the admission queue if the cap allows, mark the task
/// Scheduling, and hand it to a worker. Returns whether a task was dequeued.
async fn dispatch_next(shared: &Arc<EngineShared>) -> DimmaResult<bool> {
    let dequeued = {
        let mut state = shared.state.lock().await;
        if state.in_flight >= shared.config.max_concurrent_tasks {
            None
        } else if let Some(task_id) = state.queue.pop_front() {
            let task = state
                .tasks
                .get_mut(&task_id)
                .ok_or_else(|| DimmaError::Internal {
                    message: format!("queued task '{}' has no record", task_id),
                })?;
            task.advance(TaskStatus::Scheduling)?;
            state.in_flight += 1;
            Some(task_id)
        } else {
            None
        }
    };

    match dequeued {
        Some(task_id) => {
            tokio::spawn(place_and_execute(Arc::clone(shared), task_id));
            Ok(true)
        }
        None => Ok(false),
    }
}
