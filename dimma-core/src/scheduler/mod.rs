//! Placement engine
//!
//! Decides where a task runs, in fixed preference order: on the local host
//! if the ledger covers the estimates, on the first single remote node that
//! fits, or split across several nodes when the task is divisible. A split
//! costs a coordination round and a combine step, so a single remote that
//! fits always wins over a split even when both would work.

pub mod split;

pub use split::select_split_nodes;

use tracing::{debug, info};

use crate::error::{DimmaError, DimmaResult};
use crate::node_registry::NodeRegistry;
use crate::resource_ledger::ResourceLedger;
use crate::types::{NodeDescriptor, Task};

/// Outcome of a placement decision.
#[derive(Debug, Clone)]
pub enum Placement {
    /// Run in a container on this host; resources are already reserved.
    Local,
    /// Dispatch whole to one remote node.
    Remote(NodeDescriptor),
    /// Partition across the given nodes, in shard order.
    Split(Vec<NodeDescriptor>),
}

impl Placement {
    /// Node ids this placement assigns, in shard order; empty for local.
    pub fn assigned_node_ids(&self) -> Vec<String> {
        match self {
            Placement::Local => Vec::new(),
            Placement::Remote(node) => vec![node.id.clone()],
            Placement::Split(nodes) => nodes.iter().map(|n| n.id.clone()).collect(),
        }
    }
}

/// Decide a placement for `task`, reserving local resources when the
/// decision is Local. The caller holds the engine lock, which keeps the
/// fit check and the reservation atomic.
pub fn decide_placement(
    task: &Task,
    ledger: &mut ResourceLedger,
    registry: &NodeRegistry,
) -> DimmaResult<Placement> {
    if ledger.fits(&task.resources) {
        ledger.reserve(&task.resources)?;
        info!("Task '{}' placed locally", task.id);
        return Ok(Placement::Local);
    }

    let fitting = registry.nodes_fitting(&task.resources);
    if let Some(node) = fitting.first() {
        info!("Task '{}' placed on remote node '{}'", task.id, node.id);
        return Ok(Placement::Remote((*node).clone()));
    }

    if task.is_divisible {
        if let Some(nodes) = select_split_nodes(&task.resources, &registry.active_nodes()) {
            info!(
                "Task '{}' split across {} nodes: {:?}",
                task.id,
                nodes.len(),
                nodes.iter().map(|n| n.id.as_str()).collect::<Vec<_>>()
            );
            return Ok(Placement::Split(nodes));
        }
        debug!(
            "Task '{}' is divisible but combined node capacity does not cover it",
            task.id
        );
    }

    Err(DimmaError::NoPlacement {
        task_id: task.id.clone(),
        reason: "no local, single-remote, or split plan fits the resource estimates".to_string(),
    })
}
