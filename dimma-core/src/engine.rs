//! Dispatch engine: admission, lifecycle bookkeeping, and the public API
//!
//! The engine owns every task record from submission onward. One mutex
//! guards the admission queue, the task map, the resource ledger, and the
//! in-flight counter; status and result writes happen under it, so a reader
//! can never observe a Completed task without its result.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::catalog::TaskCatalog;
use crate::config::EngineConfig;
use crate::container::ContainerRuntime;
use crate::dispatcher::Dispatcher;
use crate::error::{DimmaError, DimmaResult};
use crate::executor::TaskExecutor;
use crate::node_registry::NodeRegistry;
use crate::resource_ledger::ResourceLedger;
use crate::scheduler::{decide_placement, Placement};
use crate::types::{ResourceEstimate, Task, TaskStatus};

pub(crate) struct EngineShared {
    pub(crate) config: EngineConfig,
    pub(crate) registry: NodeRegistry,
    pub(crate) executor: TaskExecutor,
    pub(crate) state: Mutex<EngineState>,
}

pub(crate) struct EngineState {
    pub(crate) tasks: HashMap<String, Task>,
    pub(crate) queue: VecDeque<String>,
    pub(crate) ledger: ResourceLedger,
    pub(crate) in_flight: usize,
}

/// Fog task dispatch engine
///
/// Construct it with the injected container runtime and worker client,
/// call [`start`](Self::start) to spawn the dispatcher, then feed it tasks
/// through [`submit`](Self::submit) and observe them through
/// [`status`](Self::status).
pub struct DispatchEngine {
    shared: Arc<EngineShared>,
    dispatcher: Dispatcher,
}

impl DispatchEngine {
    pub fn new(
        config: EngineConfig,
        registry: NodeRegistry,
        runtime: Arc<dyn ContainerRuntime>,
        workers: Arc<dyn crate::worker_client::WorkerClient>,
        catalog: TaskCatalog,
    ) -> Self {
        let executor = TaskExecutor::new(
            runtime,
            workers,
            Arc::new(catalog),
            config.scratch_root.clone(),
        );
        let ledger = ResourceLedger::new(config.local_capacity);
        let shared = Arc::new(EngineShared {
            registry,
            executor,
            state: Mutex::new(EngineState {
                tasks: HashMap::new(),
                queue: VecDeque::new(),
                ledger,
                in_flight: 0,
            }),
            config,
        });
        Self {
            shared,
            dispatcher: Dispatcher::new(),
        }
    }

    /// Spawn the dispatcher background loop.
    pub fn start(&mut self) {
        self.dispatcher.start(Arc::clone(&self.shared));
    }

    /// Abort the dispatcher. In-flight tasks run to completion on their
    /// workers; queued tasks stay Pending.
    pub fn stop(&mut self) {
        self.dispatcher.stop();
    }

    /// Enqueue a fully-constructed task and return its identifier. Never
    /// blocks on execution.
    pub async fn submit(&self, task: Task) -> DimmaResult<String> {
        task.validate()?;
        if task.status != TaskStatus::Pending {
            return Err(DimmaError::InvalidInput {
                field: "status".to_string(),
                message: "submitted tasks must be Pending".to_string(),
            });
        }

        let task_id = task.id.clone();
        let mut state = self.shared.state.lock().await;
        if state.tasks.contains_key(&task_id) {
            return Err(DimmaError::InvalidInput {
                field: "id".to_string(),
                message: format!("task '{}' was already submitted", task_id),
            });
        }
        state.queue.push_back(task_id.clone());
        state.tasks.insert(task_id.clone(), task);
        info!(
            "Task '{}' accepted ({} awaiting placement)",
            task_id,
            state.queue.len()
        );
        Ok(task_id)
    }

    /// Snapshot of a task's current fields, including its result when
    /// terminal. `None` for unknown identifiers.
    pub async fn status(&self, task_id: &str) -> Option<Task> {
        self.shared.state.lock().await.tasks.get(task_id).cloned()
    }

    /// Snapshot of every task record owned by the engine.
    pub async fn list_tasks(&self) -> Vec<Task> {
        self.shared
            .state
            .lock()
            .await
            .tasks
            .values()
            .cloned()
            .collect()
    }

    /// Current uncommitted local capacity.
    pub async fn available_resources(&self) -> ResourceEstimate {
        self.shared.state.lock().await.ledger.available()
    }
}

/// Worker body: place one Scheduling task, run it, and record the outcome.
/// Every failure is absorbed here and becomes the task's Failed state.
pub(crate) async fn place_and_execute(shared: Arc<EngineShared>, task_id: String) {
    let placement = {
        let mut guard = shared.state.lock().await;
        let EngineState { tasks, ledger, .. } = &mut *guard;
        match tasks.get(&task_id) {
            Some(task) => decide_placement(task, ledger, &shared.registry),
            None => Err(DimmaError::Internal {
                message: format!("task '{}' disappeared before placement", task_id),
            }),
        }
    };

    let plan = match placement {
        Ok(plan) => plan,
        Err(e) => {
            warn!("Task '{}' rejected: {}", task_id, e);
            finish_task(&shared, &task_id, Err(e), None).await;
            return;
        }
    };

    let snapshot = {
        let mut guard = shared.state.lock().await;
        let EngineState {
            tasks,
            ledger,
            in_flight,
            ..
        } = &mut *guard;
        match tasks.get_mut(&task_id) {
            Some(task) => match task.advance(TaskStatus::Running) {
                Ok(()) => {
                    task.assigned_nodes = plan.assigned_node_ids();
                    task.clone()
                }
                Err(e) => {
                    error!("Task '{}' cannot enter Running: {}", task_id, e);
                    if matches!(plan, Placement::Local) {
                        ledger.release(&task.resources);
                    }
                    *in_flight -= 1;
                    return;
                }
            },
            None => {
                error!("Task '{}' disappeared before execution", task_id);
                *in_flight -= 1;
                return;
            }
        }
    };

    // Local placements reserved ledger capacity; give it back when done.
    let reserved = matches!(plan, Placement::Local).then_some(snapshot.resources);

    let outcome = shared.executor.execute(&snapshot, &plan).await;
    finish_task(&shared, &task_id, outcome, reserved).await;
}

/// Record a terminal state: result before status, ledger release for local
/// placements, in-flight decrement last.
async fn finish_task(
    shared: &Arc<EngineShared>,
    task_id: &str,
    outcome: DimmaResult<serde_json::Value>,
    reserved: Option<ResourceEstimate>,
) {
    let mut state = shared.state.lock().await;
    if let Some(resources) = reserved {
        state.ledger.release(&resources);
    }
    match state.tasks.get_mut(task_id) {
        Some(task) => match outcome {
            Ok(value) => match task.advance(TaskStatus::Completed) {
                Ok(()) => {
                    task.result = Some(value);
                    info!("Task '{}' completed", task_id);
                }
                Err(e) => error!("Task '{}' result discarded: {}", task_id, e),
            },
            Err(e) => {
                error!("Task '{}' failed: {}", task_id, e);
                if let Err(illegal) = task.advance(TaskStatus::Failed) {
                    error!("Task '{}' could not be marked Failed: {}", task_id, illegal);
                }
            }
        },
        None => error!("Task '{}' disappeared before completion", task_id),
    }
    state.in_flight -= 1;
}
