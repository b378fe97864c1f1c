//! Link-metrics pass: criticality (alternative-path count), synthesized
//! utilization, and priority classification.
//!
//! Grounded in `topology_builder.py::_calculate_link_metrics`.

use petgraph::graph::NodeIndex;
use rand::Rng;

use crate::config::DeviceKind;

use super::{LinkType, PriorityClass, Topology, UtilizationStatus};

/// Count simple paths between `start` and `end` with at most `cutoff`
/// edges, mirroring `networkx.all_simple_paths(..., cutoff=5)`.
fn count_simple_paths(
    topo: &Topology,
    start: NodeIndex,
    end: NodeIndex,
    cutoff: usize,
) -> usize {
    fn visit(
        topo: &Topology,
        current: NodeIndex,
        end: NodeIndex,
        depth: usize,
        cutoff: usize,
        visited: &mut Vec<NodeIndex>,
    ) -> usize {
        if current == end {
            return 1;
        }
        if depth >= cutoff {
            return 0;
        }
        let mut count = 0;
        for next in topo.graph.neighbors(current) {
            if visited.contains(&next) {
                continue;
            }
            visited.push(next);
            count += visit(topo, next, end, depth + 1, cutoff, visited);
            visited.pop();
        }
        count
    }

    let mut visited = vec![start];
    visit(topo, start, end, 0, cutoff, &mut visited)
}

pub fn calculate_link_metrics(topo: &mut Topology) {
    // Collect node-pair endpoints rather than `EdgeIndex` values: removing
    // an edge below swap-removes the backing storage, which can silently
    // repoint a stale `EdgeIndex` at an unrelated edge. Node indices are
    // unaffected by edge removal, so endpoints stay valid for a fresh
    // `find_edge` lookup on every iteration.
    let endpoints: Vec<(NodeIndex, NodeIndex)> = topo
        .graph
        .edge_indices()
        .map(|e| topo.graph.edge_endpoints(e).expect("edge exists"))
        .collect();
    let mut rng = rand::thread_rng();

    for (u, v) in endpoints {
        let edge = topo.graph.find_edge(u, v).expect("edge still present");

        // Criticality: count simple paths with this edge itself excluded
        // from traversal, via temporary removal/restore.
        let attr = topo.graph[edge].clone();
        topo.graph.remove_edge(edge);
        let alt_paths = count_simple_paths(topo, u, v, 5);
        let new_edge = topo.graph.add_edge(u, v, attr);

        let bandwidth_mbps = topo.graph[new_edge].bandwidth_kbps as f64 / 1000.0;
        let link_type = topo.graph[new_edge].link_type;

        let utilization_percent = if link_type == LinkType::Ospf && bandwidth_mbps >= 1000.0 {
            rng.gen_range(20.0..60.0)
        } else if link_type == LinkType::Subnet && bandwidth_mbps <= 100.0 {
            rng.gen_range(10.0..40.0)
        } else {
            rng.gen_range(15.0..50.0)
        };
        let utilization_percent = (utilization_percent * 10.0).round() / 10.0;

        let kind_u = topo.graph[u].kind;
        let kind_v = topo.graph[v].kind;
        let priority = classify_priority(kind_u, kind_v, bandwidth_mbps);

        let entry = &mut topo.graph[new_edge];
        entry.alternative_paths = alt_paths;
        entry.is_critical = alt_paths == 0;
        entry.utilization_percent = utilization_percent;
        entry.utilization_status = UtilizationStatus::classify(utilization_percent);
        entry.priority = priority;
    }
}

fn classify_priority(a: DeviceKind, b: DeviceKind, bandwidth_mbps: f64) -> PriorityClass {
    use DeviceKind::*;
    match (a, b) {
        (Router, Router) => {
            if bandwidth_mbps >= 1000.0 {
                PriorityClass::Critical
            } else {
                PriorityClass::High
            }
        }
        (Router, Switch) | (Switch, Router) => PriorityClass::High,
        (Switch, Switch) => PriorityClass::Medium,
        _ => PriorityClass::Low,
    }
}
