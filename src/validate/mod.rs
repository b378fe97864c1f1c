//! Static Validator (C3): derives defect lists from `(records, graph)`
//! alone — no hidden state (invariant v).
//!
//! Grounded in `network_validator.py::validate_all`'s eight checks.

use std::collections::{HashMap, HashSet};

use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};

use crate::config::{DeviceKind, DeviceRecord};
use crate::topology::Topology;

/// One category of defect, with its human-readable findings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub missing_components: Vec<String>,
    pub duplicate_ips: Vec<String>,
    pub vlan_issues: Vec<String>,
    pub gateway_issues: Vec<String>,
    pub routing_recommendations: Vec<String>,
    pub mtu_mismatches: Vec<String>,
    pub network_loops: Vec<String>,
    pub aggregation_opportunities: Vec<String>,
}

/// Run every check and assemble the full report.
pub fn validate(records: &[DeviceRecord], topo: &Topology) -> ValidationReport {
    ValidationReport {
        missing_components: check_missing_components(records, topo),
        duplicate_ips: check_duplicate_ips(records),
        vlan_issues: check_vlan_consistency(records),
        gateway_issues: check_gateway_addresses(records),
        routing_recommendations: check_routing_recommendations(records),
        mtu_mismatches: check_mtu_mismatches(records, topo),
        network_loops: detect_network_loops(topo),
        aggregation_opportunities: find_aggregation_opportunities(records, topo),
    }
}

fn check_missing_components(records: &[DeviceRecord], topo: &Topology) -> Vec<String> {
    let mut issues = Vec::new();
    for record in records {
        if record.kind != DeviceKind::Host {
            continue;
        }
        let connected = topo
            .neighbor_keys(&record.key)
            .into_iter()
            .filter_map(|k| topo.node(&k).map(|n| (k, n.kind)))
            .any(|(_, kind)| kind == DeviceKind::Switch);
        if !connected {
            issues.push(format!(
                "Host {} appears to be missing associated switch configuration",
                record.key
            ));
        }
    }
    issues
}

fn check_duplicate_ips(records: &[DeviceRecord]) -> Vec<String> {
    let mut issues = Vec::new();
    let mut seen: HashMap<String, String> = HashMap::new();
    for record in records {
        for iface in &record.interfaces {
            let Some(ip) = iface.ip_address else {
                continue;
            };
            let vlan_scope = iface
                .access_vlan
                .map(|v| v.to_string())
                .unwrap_or_else(|| "default".to_string());
            let key = format!("{ip}_{vlan_scope}");
            match seen.get(&key) {
                Some(other) => issues.push(format!(
                    "Duplicate IP {ip} in VLAN {vlan_scope}: devices {other} and {}",
                    record.key
                )),
                None => {
                    seen.insert(key, record.key.clone());
                }
            }
        }
    }
    issues
}

fn check_vlan_consistency(records: &[DeviceRecord]) -> Vec<String> {
    let mut issues = Vec::new();
    let mut vlan_definitions: HashMap<u16, String> = HashMap::new();

    for record in records {
        for vlan in &record.vlans {
            match vlan_definitions.get(&vlan.id) {
                Some(existing) if existing != &vlan.name => {
                    issues.push(format!(
                        "VLAN {} has inconsistent names: '{existing}' vs '{}'",
                        vlan.id, vlan.name
                    ));
                }
                Some(_) => {}
                None => {
                    vlan_definitions.insert(vlan.id, vlan.name.clone());
                }
            }
        }
    }

    for record in records {
        for iface in &record.interfaces {
            if let Some(access_vlan) = iface.access_vlan {
                if !vlan_definitions.contains_key(&access_vlan) {
                    issues.push(format!(
                        "Interface {} on {} references undefined VLAN {access_vlan}",
                        iface.name, record.key
                    ));
                }
            }
        }
    }
    issues
}

fn check_gateway_addresses(records: &[DeviceRecord]) -> Vec<String> {
    let mut issues = Vec::new();
    for record in records {
        if record.kind != DeviceKind::Router {
            continue;
        }
        let Some(gateway) = &record.default_gateway else {
            continue;
        };
        match gateway.parse::<std::net::Ipv4Addr>() {
            Ok(gw) => {
                let reachable = record.interface_networks().any(|net| net.contains(&gw));
                if !reachable {
                    issues.push(format!(
                        "Router {} has unreachable gateway {gateway}",
                        record.key
                    ));
                }
            }
            Err(_) => {
                issues.push(format!(
                    "Router {} has invalid gateway address format: {gateway}",
                    record.key
                ));
            }
        }
    }
    issues
}

fn check_routing_recommendations(records: &[DeviceRecord]) -> Vec<String> {
    let mut recommendations = Vec::new();
    let mut as_numbers: HashSet<u32> = HashSet::new();
    let mut total_routers = 0usize;
    let mut any_ospf = false;

    for record in records {
        if record.kind != DeviceKind::Router {
            continue;
        }
        total_routers += 1;
        if let Some(asn) = record.bgp.local_as {
            as_numbers.insert(asn);
        }
        if record.ospf.enabled {
            any_ospf = true;
        }
    }

    if as_numbers.len() > 1 && any_ospf {
        recommendations.push(
            "Consider using BGP instead of OSPF for inter-AS routing between different autonomous systems"
                .to_string(),
        );
    }
    if total_routers > 50 {
        recommendations.push("Large network detected - consider BGP for better scalability".to_string());
    }
    recommendations
}

/// Preserved exactly as the source's overcounting rule (§9): this
/// compares every interface pair between the two connected devices, not
/// just the pair that forms the edge.
fn check_mtu_mismatches(records: &[DeviceRecord], topo: &Topology) -> Vec<String> {
    let mut issues = Vec::new();
    let by_key: HashMap<&str, &DeviceRecord> =
        records.iter().map(|r| (r.key.as_str(), r)).collect();

    for edge in topo.graph.edge_indices() {
        let (a, b) = topo.graph.edge_endpoints(edge).expect("edge exists");
        let u = topo.graph[a].key.as_str();
        let v = topo.graph[b].key.as_str();
        let (Some(u_cfg), Some(v_cfg)) = (by_key.get(u), by_key.get(v)) else {
            continue;
        };
        for u_iface in &u_cfg.interfaces {
            for v_iface in &v_cfg.interfaces {
                if u_iface.mtu != v_iface.mtu {
                    issues.push(format!(
                        "MTU mismatch between {u}:{} (MTU {}) and {v}:{} (MTU {})",
                        u_iface.name, u_iface.mtu, v_iface.name, v_iface.mtu
                    ));
                }
            }
        }
    }
    issues
}

fn detect_network_loops(topo: &Topology) -> Vec<String> {
    let mut visited: HashMap<NodeIndex, bool> = HashMap::new();
    let mut parent: HashMap<NodeIndex, NodeIndex> = HashMap::new();
    let mut depth: HashMap<NodeIndex, usize> = HashMap::new();
    let mut cycles: Vec<String> = Vec::new();

    for start in topo.graph.node_indices() {
        if visited.contains_key(&start) {
            continue;
        }
        dfs_find_cycles(topo, start, &mut visited, &mut parent, &mut depth, &mut cycles);
    }
    cycles
}

fn dfs_find_cycles(
    topo: &Topology,
    node: NodeIndex,
    visited: &mut HashMap<NodeIndex, bool>,
    parent: &mut HashMap<NodeIndex, NodeIndex>,
    depth: &mut HashMap<NodeIndex, usize>,
    cycles: &mut Vec<String>,
) {
    if cycles.len() >= 5 {
        return;
    }
    visited.insert(node, true);
    depth.entry(node).or_insert(0);

    for neighbor in topo.graph.neighbors(node) {
        if cycles.len() >= 5 {
            return;
        }
        if parent.get(&node) == Some(&neighbor) {
            continue;
        }
        if !visited.contains_key(&neighbor) {
            parent.insert(neighbor, node);
            depth.insert(neighbor, depth[&node] + 1);
            dfs_find_cycles(topo, neighbor, visited, parent, depth, cycles);
        } else if depth.get(&neighbor).copied().unwrap_or(0) < depth[&node] {
            let mut path = vec![node];
            let mut cur = node;
            while cur != neighbor {
                cur = parent[&cur];
                path.push(cur);
            }
            if path.len() > 2 {
                let names: Vec<String> =
                    path.iter().map(|i| topo.graph[*i].key.clone()).collect();
                cycles.push(format!("{} -> {}", names.join(" -> "), names[names.len() - 1]));
            }
        }
    }
}

fn find_aggregation_opportunities(records: &[DeviceRecord], topo: &Topology) -> Vec<String> {
    let mut opportunities = Vec::new();
    for record in records {
        let neighbors = topo.neighbor_keys(&record.key);
        if record.kind == DeviceKind::Switch && neighbors.len() <= 2 {
            opportunities.push(format!(
                "Switch {} with {} connections could potentially be aggregated",
                record.key,
                neighbors.len()
            ));
        }
        if record.kind == DeviceKind::Router
            && neighbors.len() <= 2
            && !record.ospf.enabled
            && !record.bgp.enabled
        {
            opportunities.push(format!(
                "Router {} with minimal routing could be simplified or aggregated",
                record.key
            ));
        }
    }
    opportunities
}

/// Helper used by C6: whether `a` and `b` are adjacent in the graph and
/// both run OSPF. First-writer-wins edge discovery (§4.2) means the
/// common case of two OSPF routers on a shared subnet produces a
/// `subnet`-typed edge, not an `ospf`-typed one — so this checks the
/// endpoint devices' OSPF-enabled flags rather than `link_type`,
/// standardizing the Day-1 hello-adjacency step and its assertion on the
/// same criterion (§4.6).
pub fn is_ospf_edge(records: &[DeviceRecord], topo: &Topology, a: &str, b: &str) -> bool {
    if !topo.has_edge(a, b) {
        return false;
    }
    let enabled = |key: &str| {
        records
            .iter()
            .find(|r| r.key == key)
            .map(|r| r.ospf.enabled)
            .unwrap_or(false)
    };
    enabled(a) && enabled(b)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::parse;
    use crate::topology::build;

    #[test]
    fn host_missing_switch_is_reported() {
        let pc = parse(
            "pc1",
            "hostname PC1\ninterface Fa0/0\n ip address 192.168.1.10 255.255.255.0\n",
        );
        let topo = build(std::slice::from_ref(&pc));
        let report = validate(&[pc], &topo);
        assert_eq!(report.missing_components, vec!["Host pc1 appears to be missing associated switch configuration"]);
    }

    #[test]
    fn duplicate_ip_scoped_by_vlan_is_not_reported() {
        let h1 = parse(
            "h1",
            "interface Fa0/0\n switchport access vlan 10\n ip address 10.0.0.5 255.255.255.0\n",
        );
        let h2 = parse(
            "h2",
            "interface Fa0/0\n switchport access vlan 20\n ip address 10.0.0.5 255.255.255.0\n",
        );
        let records = vec![h1, h2];
        let topo = build(&records);
        let report = validate(&records, &topo);
        assert!(report.duplicate_ips.is_empty());
    }
}
