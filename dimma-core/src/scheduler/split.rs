//! Greedy node selection for split placement
//!
//! Biggest-first selection minimises the number of parallel shards while
//! guaranteeing that the chosen nodes' combined advertised capacity
//! dominates the requirement.

use crate::types::{NodeDescriptor, ResourceEstimate};

/// Pick a subset of `active` whose combined capacity covers `request`.
///
/// Nodes are ranked by `cpu + ram` descending; ties keep registration order
/// (the sort is stable). Returns `None` when even the combined capacity of
/// every active node falls short on any dimension.
pub fn select_split_nodes(
    request: &ResourceEstimate,
    active: &[&NodeDescriptor],
) -> Option<Vec<NodeDescriptor>> {
    let total = active.iter().fold(
        ResourceEstimate::new(0.0, 0.0, 0.0),
        |acc, node| {
            ResourceEstimate::new(
                acc.cpu_cores + node.capacity.cpu_cores,
                acc.ram_gb + node.capacity.ram_gb,
                acc.gpu_units + node.capacity.gpu_units,
            )
        },
    );
    if !total.covers(request) {
        return None;
    }

    let mut ranked: Vec<&NodeDescriptor> = active.to_vec();
    ranked.sort_by(|a, b| {
        let weight_a = a.capacity.cpu_cores + a.capacity.ram_gb;
        let weight_b = b.capacity.cpu_cores + b.capacity.ram_gb;
        weight_b
            .partial_cmp(&weight_a)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut remaining = *request;
    let mut chosen = Vec::new();
    for node in ranked {
        chosen.push(node.clone());
        remaining.cpu_cores -= node.capacity.cpu_cores;
        remaining.ram_gb -= node.capacity.ram_gb;
        remaining.gpu_units -= node.capacity.gpu_units;
        if remaining.cpu_cores <= 0.0 && remaining.ram_gb <= 0.0 && remaining.gpu_units <= 0.0 {
            break;
        }
    }
    Some(chosen)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, cpu: f64, ram: f64, gpu: f64) -> NodeDescriptor {
        NodeDescriptor {
            id: id.to_string(),
            host: "10.0.0.1".to_string(),
            port: 8000,
            capacity: ResourceEstimate::new(cpu, ram, gpu),
            active: true,
        }
    }

    #[test]
    fn test_biggest_nodes_are_taken_first() {
        let n1 = node("n1", 1.0, 2.0, 0.0);
        let n2 = node("n2", 4.0, 8.0, 0.0);
        let n3 = node("n3", 2.0, 4.0, 0.0);
        let active = vec![&n1, &n2, &n3];

        let chosen =
            select_split_nodes(&ResourceEstimate::new(5.0, 10.0, 0.0), &active).unwrap();
        assert_eq!(
            chosen.iter().map(|n| n.id.as_str()).collect::<Vec<_>>(),
            vec!["n2", "n3"]
        );
    }

    #[test]
    fn test_ties_keep_registration_order() {
        let n1 = node("n1", 2.0, 4.0, 0.0);
        let n2 = node("n2", 2.0, 4.0, 0.0);
        let active = vec![&n1, &n2];

        let chosen = select_split_nodes(&ResourceEstimate::new(3.0, 6.0, 0.0), &active).unwrap();
        assert_eq!(
            chosen.iter().map(|n| n.id.as_str()).collect::<Vec<_>>(),
            vec!["n1", "n2"]
        );
    }

    #[test]
    fn test_selection_stops_once_covered() {
        let n1 = node("n1", 8.0, 16.0, 1.0);
        let n2 = node("n2", 2.0, 4.0, 0.0);
        let active = vec![&n1, &n2];

        let chosen = select_split_nodes(&ResourceEstimate::new(4.0, 8.0, 1.0), &active).unwrap();
        assert_eq!(chosen.len(), 1);
        assert_eq!(chosen[0].id, "n1");
    }

    #[test]
    fn test_insufficient_combined_capacity() {
        let n1 = node("n1", 1.0, 2.0, 0.0);
        let n2 = node("n2", 1.0, 2.0, 0.0);
        let active = vec![&n1, &n2];

        assert!(select_split_nodes(&ResourceEstimate::new(3.0, 1.0, 0.0), &active).is_none());
        // GPU shortfall alone also rules a split out.
        assert!(select_split_nodes(&ResourceEstimate::new(1.0, 1.0, 0.5), &active).is_none());
    }

    #[test]
    fn test_no_active_nodes() {
        assert!(select_split_nodes(&ResourceEstimate::new(1.0, 1.0, 0.0), &[]).is_none());
        // A zero requirement is covered by an empty selection only in the
        // degenerate sense; the caller never asks for it, but the sum check
        // still admits it.
        assert!(select_split_nodes(&ResourceEstimate::new(0.0, 0.0, 0.0), &[]).is_some());
    }
}
