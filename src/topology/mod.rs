//! Topology Builder (C2): merges device records into an undirected,
//! node- and edge-attributed graph.
//!
//! Grounded in `topology_builder.py::build_from_configs`'s five-pass
//! pipeline (nodes, IP-subnet, OSPF, BGP, description, link-metrics),
//! reshaped onto `petgraph::graph::UnGraph` per the arena-and-index
//! design note (spec §9): devices and interfaces no longer hold cyclic
//! back-references, just stable `NodeIndex`/`EdgeIndex` values.

pub mod export;
pub mod metrics;
pub mod passes;

use std::collections::HashMap;

use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use serde::{Deserialize, Serialize};

use crate::config::{DeviceKind, DeviceRecord};

/// Which pass discovered an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    Subnet,
    Ospf,
    Bgp,
    Description,
}

impl std::fmt::Display for LinkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LinkType::Subnet => "subnet",
            LinkType::Ospf => "ospf",
            LinkType::Bgp => "bgp",
            LinkType::Description => "description",
        };
        f.write_str(s)
    }
}

/// Priority class derived from the endpoint device kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityClass {
    Critical,
    High,
    Medium,
    Low,
}

/// Utilization class derived from the synthesized utilization percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UtilizationStatus {
    Low,
    Normal,
    High,
    Critical,
}

impl UtilizationStatus {
    pub fn classify(percent: f64) -> Self {
        if percent < 30.0 {
            UtilizationStatus::Low
        } else if percent < 70.0 {
            UtilizationStatus::Normal
        } else if percent < 90.0 {
            UtilizationStatus::High
        } else {
            UtilizationStatus::Critical
        }
    }
}

/// Aggregated interface-bandwidth summary for a device node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BandwidthSummary {
    pub total_kbps: u64,
    pub total_mbps: f64,
    pub active_count: usize,
    pub total_count: usize,
}

/// Node attributes attached to every device in the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeAttr {
    pub key: String,
    pub hostname: Option<String>,
    pub kind: DeviceKind,
    pub icon: &'static str,
    pub bandwidth_summary: BandwidthSummary,
}

/// Edge attributes attached to every discovered adjacency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeAttr {
    pub link_type: LinkType,
    pub subnet: Option<String>,
    pub bandwidth_kbps: u64,
    /// OSPF cost; only populated for `subnet` and `ospf` edges.
    pub cost: Option<u32>,
    pub peer_address: Option<std::net::Ipv4Addr>,
    pub local_as: Option<u32>,
    pub remote_as: Option<u32>,
    pub utilization_percent: f64,
    pub utilization_status: UtilizationStatus,
    pub is_critical: bool,
    pub alternative_paths: usize,
    pub priority: PriorityClass,
}

impl EdgeAttr {
    fn new(link_type: LinkType, bandwidth_kbps: u64) -> Self {
        Self {
            link_type,
            subnet: None,
            bandwidth_kbps,
            cost: None,
            peer_address: None,
            local_as: None,
            remote_as: None,
            utilization_percent: 0.0,
            utilization_status: UtilizationStatus::Low,
            is_critical: false,
            alternative_paths: 0,
            priority: PriorityClass::Low,
        }
    }
}

/// The topology graph plus its key → index lookup.
#[derive(Debug, Clone)]
pub struct Topology {
    pub graph: UnGraph<NodeAttr, EdgeAttr>,
    index: HashMap<String, NodeIndex>,
}

impl Topology {
    fn new() -> Self {
        Self {
            graph: UnGraph::new_undirected(),
            index: HashMap::new(),
        }
    }

    pub fn node_index(&self, key: &str) -> Option<NodeIndex> {
        self.index.get(key).copied()
    }

    pub fn node(&self, key: &str) -> Option<&NodeAttr> {
        self.node_index(key).map(|i| &self.graph[i])
    }

    pub fn has_edge(&self, a: &str, b: &str) -> bool {
        self.find_edge(a, b).is_some()
    }

    pub fn find_edge(&self, a: &str, b: &str) -> Option<EdgeIndex> {
        let (ia, ib) = (self.node_index(a)?, self.node_index(b)?);
        self.graph.find_edge(ia, ib)
    }

    pub fn edge(&self, a: &str, b: &str) -> Option<&EdgeAttr> {
        self.find_edge(a, b).map(|e| &self.graph[e])
    }

    /// Neighbors of `key` by their node key, in arbitrary order.
    pub fn neighbor_keys(&self, key: &str) -> Vec<String> {
        match self.node_index(key) {
            Some(idx) => self
                .graph
                .neighbors(idx)
                .map(|n| self.graph[n].key.clone())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Remove the edge between `a` and `b`. Idempotent: a no-op if the
    /// edge does not exist. Used by simulation fault injection.
    pub fn remove_edge(&mut self, a: &str, b: &str) -> Option<EdgeAttr> {
        let edge = self.find_edge(a, b)?;
        self.graph.remove_edge(edge)
    }

    /// Re-add a previously removed edge with the given attributes.
    /// Idempotent: a no-op if the edge already exists.
    pub fn restore_edge(&mut self, a: &str, b: &str, attr: EdgeAttr) {
        if self.has_edge(a, b) {
            return;
        }
        if let (Some(ia), Some(ib)) = (self.node_index(a), self.node_index(b)) {
            self.graph.add_edge(ia, ib, attr);
        }
    }

    pub fn node_keys(&self) -> impl Iterator<Item = &str> {
        self.graph.node_weights().map(|n| n.key.as_str())
    }
}

/// Build the topology graph from a batch of device records. Pure
/// function of `records` (spec invariant v, extended to the builder
/// itself: no hidden state, same input graph every call).
pub fn build(records: &[DeviceRecord]) -> Topology {
    let mut topo = Topology::new();

    for record in records {
        let idx = topo.graph.add_node(node_attr(record));
        topo.index.insert(record.key.clone(), idx);
    }

    passes::discover_ip_subnet_links(&mut topo, records);
    passes::discover_ospf_links(&mut topo, records);
    passes::discover_bgp_links(&mut topo, records);
    passes::discover_description_links(&mut topo, records);
    metrics::calculate_link_metrics(&mut topo);

    topo
}

fn node_attr(record: &DeviceRecord) -> NodeAttr {
    let total_kbps: u64 = record
        .interfaces
        .iter()
        .filter(|i| i.admin_up)
        .map(|i| i.bandwidth_kbps)
        .sum();
    let active_count = record.interfaces.iter().filter(|i| i.admin_up).count();
    NodeAttr {
        key: record.key.clone(),
        hostname: record.hostname.clone(),
        kind: record.kind,
        icon: record.kind.icon_hint(),
        bandwidth_summary: BandwidthSummary {
            total_kbps,
            total_mbps: total_kbps as f64 / 1000.0,
            active_count,
            total_count: record.interfaces.len(),
        },
    }
}

/// OSPF cost formula: reference bandwidth is always the hard-coded
/// 100 000 kbps constant, never the parsed `auto-cost reference-bandwidth`
/// value (§4.1/§9 — the parsed value is metadata only).
pub fn ospf_cost(bandwidth_kbps: u64) -> u32 {
    const REFERENCE_BANDWIDTH_KBPS: u64 = 100_000;
    if bandwidth_kbps == 0 {
        return 65535;
    }
    (REFERENCE_BANDWIDTH_KBPS / bandwidth_kbps).clamp(1, 65535) as u32
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::parse;

    fn two_routers_one_subnet() -> Vec<DeviceRecord> {
        let r1 = parse(
            "r1",
            "hostname R1\ninterface Gi0/0\n ip address 10.0.0.1 255.255.255.252\nrouter ospf 1\n network 10.0.0.0 0.0.0.3 area 0\n",
        );
        let r2 = parse(
            "r2",
            "hostname R2\ninterface Gi0/0\n ip address 10.0.0.2 255.255.255.252\nrouter ospf 1\n network 10.0.0.0 0.0.0.3 area 0\n",
        );
        vec![r1, r2]
    }

    #[test]
    fn scenario_two_routers_one_subnet() {
        let records = two_routers_one_subnet();
        let topo = build(&records);
        assert!(topo.has_edge("r1", "r2"));
        let edge = topo.edge("r1", "r2").unwrap();
        assert_eq!(edge.link_type, LinkType::Subnet);
        assert_eq!(edge.cost, Some(1));
        assert_eq!(topo.node("r1").unwrap().kind, DeviceKind::Router);
        assert_eq!(topo.node("r2").unwrap().kind, DeviceKind::Router);
    }

    #[test]
    fn cost_formula_matches_spec() {
        assert_eq!(ospf_cost(1_000_000), 1);
        assert_eq!(ospf_cost(0), 65535);
        assert_eq!(ospf_cost(100_000), 1);
        assert_eq!(ospf_cost(1_544), 64);
    }

    #[test]
    fn fault_injection_round_trip() {
        let records = two_routers_one_subnet();
        let mut topo = build(&records);
        let attr = topo.edge("r1", "r2").unwrap().clone();
        assert!(topo.remove_edge("r1", "r2").is_some());
        assert!(!topo.has_edge("r1", "r2"));
        topo.restore_edge("r1", "r2", attr);
        assert!(topo.has_edge("r1", "r2"));
        // idempotent
        assert!(topo.remove_edge("r1", "r2").is_some());
        assert!(topo.remove_edge("r1", "r2").is_none());
    }
}
