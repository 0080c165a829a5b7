//! Static catalogue of remote worker nodes
//!
//! The registry is read-only after construction. It answers capability
//! queries in registration order; whether a node is actually reachable is
//! discovered at dispatch time and reported through the task's result path.

use crate::types::{NodeDescriptor, ResourceEstimate};

pub struct NodeRegistry {
    nodes: Vec<NodeDescriptor>,
}

impl NodeRegistry {
    pub fn new(nodes: Vec<NodeDescriptor>) -> Self {
        Self { nodes }
    }

    /// All active nodes whose advertised capacity covers `request`, in
    /// registration order.
    pub fn nodes_fitting(&self, request: &ResourceEstimate) -> Vec<&NodeDescriptor> {
        self.nodes
            .iter()
            .filter(|node| node.active && node.capacity.covers(request))
            .collect()
    }

    /// Every active node, in registration order.
    pub fn active_nodes(&self) -> Vec<&NodeDescriptor> {
        self.nodes.iter().filter(|node| node.active).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, cpu: f64, ram: f64, gpu: f64, active: bool) -> NodeDescriptor {
        NodeDescriptor {
            id: id.to_string(),
            host: "10.0.0.1".to_string(),
            port: 8000,
            capacity: ResourceEstimate::new(cpu, ram, gpu),
            active,
        }
    }

    #[test]
    fn test_nodes_fitting_filters_capacity_and_activity() {
        let registry = NodeRegistry::new(vec![
            node("n1", 2.0, 4.0, 0.0, true),
            node("n2", 8.0, 16.0, 1.0, true),
            node("n3", 8.0, 16.0, 1.0, false),
        ]);

        let fitting = registry.nodes_fitting(&ResourceEstimate::new(4.0, 8.0, 0.0));
        assert_eq!(fitting.len(), 1);
        assert_eq!(fitting[0].id, "n2");
    }

    #[test]
    fn test_queries_preserve_registration_order() {
        let registry = NodeRegistry::new(vec![
            node("n1", 4.0, 8.0, 0.0, true),
            node("n2", 4.0, 8.0, 0.0, true),
            node("n3", 4.0, 8.0, 0.0, true),
        ]);

        let request = ResourceEstimate::new(1.0, 1.0, 0.0);
        let ids: Vec<_> = registry
            .nodes_fitting(&request)
            .iter()
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(ids, vec!["n1", "n2", "n3"]);

        let active: Vec<_> = registry.active_nodes().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(active, vec!["n1", "n2", "n3"]);
    }

    #[test]
    fn test_inactive_nodes_are_invisible() {
        let registry = NodeRegistry::new(vec![node("n1", 4.0, 8.0, 0.0, false)]);
        assert!(registry.active_nodes().is_empty());
        assert!(registry
            .nodes_fitting(&ResourceEstimate::new(0.0, 0.0, 0.0))
            .is_empty());
    }
}
