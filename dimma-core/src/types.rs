//! Core data model: task records, node descriptors, resource estimates

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{DimmaError, DimmaResult};

/// Resource estimates for a task, or advertised capacity of a node.
///
/// CPU is in cores, RAM in gigabytes; GPU is a fraction of one device in
/// `[0, 1]` for task estimates and a unit count for node capacities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceEstimate {
    pub cpu_cores: f64,
    pub ram_gb: f64,
    pub gpu_units: f64,
}

impl ResourceEstimate {
    pub fn new(cpu_cores: f64, ram_gb: f64, gpu_units: f64) -> Self {
        Self {
            cpu_cores,
            ram_gb,
            gpu_units,
        }
    }

    /// True when every component of `self` covers the corresponding
    /// component of `other`.
    pub fn covers(&self, other: &ResourceEstimate) -> bool {
        self.cpu_cores >= other.cpu_cores
            && self.ram_gb >= other.ram_gb
            && self.gpu_units >= other.gpu_units
    }
}

/// Lifecycle states of a task. Completed and Failed are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    Pending,
    Scheduling,
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    /// Forward-only transitions; no retries, no backward edges.
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (self, next),
            (Pending, Scheduling)
                | (Scheduling, Running)
                | (Scheduling, Failed)
                | (Running, Completed)
                | (Running, Failed)
        )
    }
}

/// One unit of work owned by the engine from submission onward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier, assigned at construction.
    pub id: String,
    /// Free-form tag that keys into the image catalog.
    pub task_type: String,
    /// Input payload; key order is preserved for split partitioning.
    pub input: Map<String, Value>,
    pub resources: ResourceEstimate,
    /// Whether the input mapping may be partitioned key-wise across workers.
    pub is_divisible: bool,
    /// Wall-clock execution deadline in whole seconds.
    pub max_execution_time: u64,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    /// Node ids chosen by placement; empty for pending or local tasks.
    pub assigned_nodes: Vec<String>,
    /// Present iff status is Completed.
    pub result: Option<Value>,
}

impl Task {
    /// Construct a Pending task with a fresh identifier.
    pub fn new(
        task_type: impl Into<String>,
        input: Map<String, Value>,
        resources: ResourceEstimate,
        is_divisible: bool,
        max_execution_time: u64,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            task_type: task_type.into(),
            input,
            resources,
            is_divisible,
            max_execution_time,
            status: TaskStatus::Pending,
            created_at: Utc::now(),
            assigned_nodes: Vec::new(),
            result: None,
        }
    }

    /// Apply a status transition, rejecting any edge outside the state
    /// machine. An illegal transition is a programming error; the engine
    /// routes it through its error path rather than corrupting the record.
    pub fn advance(&mut self, next: TaskStatus) -> DimmaResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(DimmaError::Internal {
                message: format!(
                    "illegal status transition {:?} -> {:?} for task '{}'",
                    self.status, next, self.id
                ),
            });
        }
        self.status = next;
        Ok(())
    }

    /// Validate the constraints the engine relies on. Called at submission;
    /// violations are surfaced to the caller rather than recorded on the task.
    pub fn validate(&self) -> DimmaResult<()> {
        if self.resources.cpu_cores < 0.0 {
            return Err(DimmaError::InvalidInput {
                field: "cpu_cores".to_string(),
                message: "CPU estimate must be non-negative".to_string(),
            });
        }
        if self.resources.ram_gb < 0.0 {
            return Err(DimmaError::InvalidInput {
                field: "ram_gb".to_string(),
                message: "RAM estimate must be non-negative".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.resources.gpu_units) {
            return Err(DimmaError::InvalidInput {
                field: "gpu_units".to_string(),
                message: "GPU estimate must lie in [0, 1]".to_string(),
            });
        }
        if self.max_execution_time == 0 {
            return Err(DimmaError::InvalidInput {
                field: "max_execution_time".to_string(),
                message: "execution time limit must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Advertised description of a remote worker node. Immutable for the life
/// of a registry instance; the active flag is an advertised attribute, not
/// a health probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDescriptor {
    pub id: String,
    pub host: String,
    pub port: u16,
    pub capacity: ResourceEstimate,
    pub active: bool,
}

impl NodeDescriptor {
    /// Base URL for the node's worker endpoint.
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task_with(resources: ResourceEstimate, max_secs: u64) -> Task {
        Task::new("text_analysis", Map::new(), resources, false, max_secs)
    }

    #[test]
    fn test_status_transitions() {
        use TaskStatus::*;
        assert!(Pending.can_transition_to(Scheduling));
        assert!(Scheduling.can_transition_to(Running));
        assert!(Scheduling.can_transition_to(Failed));
        assert!(Running.can_transition_to(Completed));
        assert!(Running.can_transition_to(Failed));

        // No backward or skipping edges.
        assert!(!Pending.can_transition_to(Running));
        assert!(!Completed.can_transition_to(Running));
        assert!(!Failed.can_transition_to(Scheduling));
        assert!(!Running.can_transition_to(Pending));
    }

    #[test]
    fn test_advance_enforces_the_state_machine() {
        let mut task = task_with(ResourceEstimate::new(1.0, 1.0, 0.0), 10);

        // The illegal edge is rejected and leaves the status untouched.
        let result = task.advance(TaskStatus::Running);
        assert!(matches!(result, Err(DimmaError::Internal { .. })));
        assert_eq!(task.status, TaskStatus::Pending);

        task.advance(TaskStatus::Scheduling).unwrap();
        task.advance(TaskStatus::Running).unwrap();
        task.advance(TaskStatus::Completed).unwrap();

        // Terminal states accept nothing further.
        assert!(task.advance(TaskStatus::Failed).is_err());
    }

    #[test]
    fn test_terminal_states() {
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
    }

    #[test]
    fn test_task_ids_are_distinct() {
        let a = task_with(ResourceEstimate::new(1.0, 1.0, 0.0), 10);
        let b = task_with(ResourceEstimate::new(1.0, 1.0, 0.0), 10);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_validation_rejects_bad_estimates() {
        assert!(task_with(ResourceEstimate::new(-1.0, 1.0, 0.0), 10)
            .validate()
            .is_err());
        assert!(task_with(ResourceEstimate::new(1.0, -1.0, 0.0), 10)
            .validate()
            .is_err());
        assert!(task_with(ResourceEstimate::new(1.0, 1.0, 1.5), 10)
            .validate()
            .is_err());
        assert!(task_with(ResourceEstimate::new(1.0, 1.0, 0.5), 0)
            .validate()
            .is_err());
        assert!(task_with(ResourceEstimate::new(1.0, 1.0, 0.5), 10)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_covers() {
        let cap = ResourceEstimate::new(4.0, 8.0, 1.0);
        assert!(cap.covers(&ResourceEstimate::new(4.0, 8.0, 1.0)));
        assert!(cap.covers(&ResourceEstimate::new(1.0, 2.0, 0.0)));
        assert!(!cap.covers(&ResourceEstimate::new(5.0, 2.0, 0.0)));
        assert!(!cap.covers(&ResourceEstimate::new(1.0, 9.0, 0.0)));
    }
}
