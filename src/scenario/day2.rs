//! Day-2 Driver (C7): steady-state probes, redundancy tests, report
//! aggregation, run on the caller thread against a static
//! `(records, topology)` pair (§4.7).
//!
//! Grounded in `original_source/src/day2_testing.py`'s
//! `Day2NetworkTester`; every section below mirrors one of its
//! `_run_*`/`_validate_*`/`_test_*` methods.

use std::collections::HashMap;

use petgraph::graph::NodeIndex;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::{DeviceKind, DeviceRecord};
use crate::topology::Topology;
use crate::traffic::{self, CapacityReport};
use crate::validate::{self, ValidationReport};

use super::report::{next_test_schedule, now_iso8601};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectivityResults {
    pub reachability_matrix: HashMap<String, HashMap<String, bool>>,
    pub latency_measurements: HashMap<String, HashMap<String, f64>>,
    pub packet_loss_rates: HashMap<String, HashMap<String, f64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThroughputTest {
    pub max_throughput_mbps: f64,
    pub current_throughput_mbps: f64,
    pub utilization_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BandwidthUtilization {
    pub inbound_util_percent: f64,
    pub outbound_util_percent: f64,
    pub peak_util_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceStat {
    pub rx_packets: u64,
    pub tx_packets: u64,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub rx_errors: u32,
    pub tx_errors: u32,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemStats {
    pub cpu_utilization_percent: f64,
    pub memory_utilization_percent: f64,
    pub temperature_celsius: f64,
    pub power_consumption_watts: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueDepths {
    pub input_queue_depth: u32,
    pub output_queue_depth: u32,
    pub priority_queue_depth: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceResults {
    pub throughput_tests: HashMap<String, ThroughputTest>,
    pub bandwidth_utilization: HashMap<String, BandwidthUtilization>,
    pub interface_statistics: HashMap<String, HashMap<String, InterfaceStat>>,
    pub cpu_memory_usage: HashMap<String, SystemStats>,
    pub queue_depths: HashMap<String, QueueDepths>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigComplianceFlags {
    pub hostname_configured: bool,
    pub interfaces_configured: bool,
    pub routing_configured: bool,
    pub security_configured: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecuritySettingsFlags {
    pub access_lists_configured: bool,
    pub authentication_enabled: bool,
    pub encryption_enabled: bool,
    pub logging_configured: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConsistencyFlags {
    pub ospf_consistent: bool,
    pub bgp_consistent: bool,
    pub static_routes_valid: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigValidationResults {
    pub configuration_compliance: HashMap<String, ConfigComplianceFlags>,
    pub security_settings: HashMap<String, SecuritySettingsFlags>,
    pub routing_consistency: HashMap<String, RoutingConsistencyFlags>,
    pub best_practices_check: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathRedundancy {
    pub primary_path: Vec<String>,
    pub backup_paths: Vec<Vec<String>>,
    pub path_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailoverTest {
    pub link: String,
    pub affected_pairs: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RedundancyResults {
    pub path_redundancy: HashMap<String, PathRedundancy>,
    pub failover_tests: HashMap<String, FailoverTest>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecurityResults {
    pub access_control: HashMap<String, bool>,
    pub authentication: HashMap<String, bool>,
    pub encryption: HashMap<String, bool>,
    pub vulnerability_assessment: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProtocolResults {
    pub ospf_validation: HashMap<String, bool>,
    pub bgp_validation: HashMap<String, bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CapacityPlanningResults {
    pub current_utilization: HashMap<String, f64>,
    pub bottleneck_analysis: HashMap<String, bool>,
    pub scaling_recommendations: HashMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BaselineComparison {
    Unavailable { status: String },
}

impl Default for BaselineComparison {
    fn default() -> Self {
        Self::Unavailable { status: "No baseline available".to_string() }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestSummary {
    pub total_tests: usize,
    pub passed_tests: usize,
    pub failed_tests: usize,
    pub warnings: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Day2Report {
    pub test_execution_time: String,
    pub test_summary: TestSummary,
    pub connectivity_tests: ConnectivityResults,
    pub performance_tests: PerformanceResults,
    pub configuration_validation: ConfigValidationResults,
    pub redundancy_tests: RedundancyResults,
    pub security_validation: SecurityResults,
    pub protocol_validation: ProtocolResults,
    pub capacity_planning: CapacityPlanningResults,
    pub baseline_comparison: BaselineComparison,
    pub recommendations: Vec<String>,
    pub next_test_schedule: String,
}

/// Run every Day-2 section and assemble the final report.
pub fn run(records: &[DeviceRecord], topo: &Topology) -> Day2Report {
    let mut rng = rand::thread_rng();

    let connectivity_tests = run_connectivity_tests(topo, &mut rng);
    let performance_tests = run_performance_tests(records, topo, &mut rng);
    let validation_report = validate::validate(records, topo);
    let configuration_validation = validate_configurations(records, &validation_report);
    let redundancy_tests = run_redundancy_tests(topo);
    let security_validation = validate_security(records);
    let protocol_validation = validate_protocols(records);
    let capacity_report = traffic::analyze_capacity(topo);
    let capacity_planning = analyze_capacity_planning(topo, &capacity_report, &mut rng);

    let failed_tests = connectivity_tests
        .reachability_matrix
        .values()
        .flat_map(|row| row.values())
        .filter(|reachable| !**reachable)
        .count()
        + redundancy_tests
            .path_redundancy
            .values()
            .filter(|p| p.path_count == 0)
            .count();
    let warnings = capacity_report.bottlenecks.len()
        + validation_report.vlan_issues.len()
        + validation_report.mtu_mismatches.len();
    let total_tests = connectivity_tests
        .reachability_matrix
        .values()
        .map(|row| row.len())
        .sum::<usize>()
        + redundancy_tests.path_redundancy.len()
        + records.len() * 5;
    let passed_tests = total_tests.saturating_sub(failed_tests).saturating_sub(warnings);

    let recommendations = generate_recommendations(&capacity_report, &redundancy_tests);

    Day2Report {
        test_execution_time: now_iso8601(),
        test_summary: TestSummary { total_tests, passed_tests, failed_tests, warnings },
        connectivity_tests,
        performance_tests,
        configuration_validation,
        redundancy_tests,
        security_validation,
        protocol_validation,
        capacity_planning,
        baseline_comparison: BaselineComparison::default(),
        recommendations,
        next_test_schedule: next_test_schedule(),
    }
}

fn run_connectivity_tests(topo: &Topology, rng: &mut impl Rng) -> ConnectivityResults {
    let mut results = ConnectivityResults::default();
    let keys: Vec<&str> = topo.node_keys().collect();

    for &src in &keys {
        let mut reach_row = HashMap::new();
        let mut latency_row = HashMap::new();
        let mut loss_row = HashMap::new();
        for &dst in &keys {
            if src == dst {
                continue;
            }
            let path = shortest_path_len(topo, src, dst);
            let reachable = path.map(|len| len > 1).unwrap_or(false);
            let latency = match path {
                Some(len) if reachable => 1.0 + (len as f64 - 1.0) * rng.gen_range(0.2..1.5),
                _ => 999.0,
            };
            let loss = if reachable { rng.gen_range(0.0..0.1) } else { 100.0 };
            reach_row.insert(dst.to_string(), reachable);
            latency_row.insert(dst.to_string(), latency);
            loss_row.insert(dst.to_string(), loss);
        }
        results.reachability_matrix.insert(src.to_string(), reach_row);
        results.latency_measurements.insert(src.to_string(), latency_row);
        results.packet_loss_rates.insert(src.to_string(), loss_row);
    }
    results
}

fn shortest_path_len(topo: &Topology, src: &str, dst: &str) -> Option<usize> {
    let path = bfs_path(topo, src, dst)?;
    Some(path.len())
}

fn bfs_path(topo: &Topology, src: &str, dst: &str) -> Option<Vec<NodeIndex>> {
    let (isrc, idst) = (topo.node_index(src)?, topo.node_index(dst)?);
    bfs_path_indices(topo, isrc, idst)
}

fn bfs_path_indices(topo: &Topology, src: NodeIndex, dst: NodeIndex) -> Option<Vec<NodeIndex>> {
    use std::collections::VecDeque;
    if src == dst {
        return Some(vec![src]);
    }
    let mut visited: HashMap<NodeIndex, NodeIndex> = HashMap::new();
    let mut queue = VecDeque::new();
    queue.push_back(src);
    visited.insert(src, src);
    while let Some(cur) = queue.pop_front() {
        if cur == dst {
            let mut path = vec![dst];
            let mut node = dst;
            while node != src {
                node = visited[&node];
                path.push(node);
            }
            path.reverse();
            return Some(path);
        }
        for next in topo.graph.neighbors(cur) {
            if !visited.contains_key(&next) {
                visited.insert(next, cur);
                queue.push_back(next);
            }
        }
    }
    None
}

fn run_performance_tests(
    records: &[DeviceRecord],
    topo: &Topology,
    rng: &mut impl Rng,
) -> PerformanceResults {
    let mut results = PerformanceResults::default();
    for key in topo.node_keys().map(str::to_string).collect::<Vec<_>>() {
        let Some(node) = topo.node(&key) else { continue };
        let max_tp = match node.kind {
            DeviceKind::Router => 1000.0,
            DeviceKind::Switch => 10_000.0,
            DeviceKind::Host => 100.0,
        };
        let cur_tp = max_tp * rng.gen_range(0.3..0.8);
        results.throughput_tests.insert(
            key.clone(),
            ThroughputTest {
                max_throughput_mbps: max_tp,
                current_throughput_mbps: cur_tp,
                utilization_percent: (cur_tp / max_tp) * 100.0,
            },
        );
        results.bandwidth_utilization.insert(
            key.clone(),
            BandwidthUtilization {
                inbound_util_percent: rng.gen_range(20.0..80.0),
                outbound_util_percent: rng.gen_range(20.0..80.0),
                peak_util_percent: rng.gen_range(80.0..95.0),
            },
        );

        if let Some(record) = records.iter().find(|r| r.key == key) {
            let mut stats = HashMap::new();
            for iface in &record.interfaces {
                stats.insert(
                    iface.name.clone(),
                    InterfaceStat {
                        rx_packets: rng.gen_range(1_000_000..10_000_000),
                        tx_packets: rng.gen_range(1_000_000..10_000_000),
                        rx_bytes: rng.gen_range(100_000_000..1_000_000_000),
                        tx_bytes: rng.gen_range(100_000_000..1_000_000_000),
                        rx_errors: rng.gen_range(0..100),
                        tx_errors: rng.gen_range(0..100),
                        status: if rng.gen_bool(0.9) { "up".to_string() } else { "down".to_string() },
                    },
                );
            }
            results.interface_statistics.insert(key.clone(), stats);
        }

        results.cpu_memory_usage.insert(
            key.clone(),
            SystemStats {
                cpu_utilization_percent: rng.gen_range(10.0..80.0),
                memory_utilization_percent: rng.gen_range(30.0..70.0),
                temperature_celsius: rng.gen_range(35.0..65.0),
                power_consumption_watts: rng.gen_range(50.0..200.0),
            },
        );
        results.queue_depths.insert(
            key,
            QueueDepths {
                input_queue_depth: rng.gen_range(0..100),
                output_queue_depth: rng.gen_range(0..100),
                priority_queue_depth: rng.gen_range(0..50),
            },
        );
    }
    results
}

fn validate_configurations(
    records: &[DeviceRecord],
    validation_report: &ValidationReport,
) -> ConfigValidationResults {
    let mut results = ConfigValidationResults {
        best_practices_check: validation_report.duplicate_ips.clone(),
        ..Default::default()
    };
    for record in records {
        results.configuration_compliance.insert(
            record.key.clone(),
            ConfigComplianceFlags {
                hostname_configured: record.hostname.is_some(),
                interfaces_configured: !record.interfaces.is_empty(),
                routing_configured: record.ospf.enabled || record.bgp.enabled,
                security_configured: true,
            },
        );
        results.security_settings.insert(
            record.key.clone(),
            SecuritySettingsFlags {
                access_lists_configured: !record.access_lists.is_empty(),
                authentication_enabled: true,
                encryption_enabled: true,
                logging_configured: true,
            },
        );
        results.routing_consistency.insert(
            record.key.clone(),
            RoutingConsistencyFlags {
                ospf_consistent: record.ospf.enabled,
                bgp_consistent: record.bgp.enabled,
                static_routes_valid: true,
            },
        );
    }
    results
}

fn run_redundancy_tests(topo: &Topology) -> RedundancyResults {
    let mut results = RedundancyResults::default();
    let keys: Vec<String> = topo.node_keys().map(str::to_string).collect();

    for i in 0..keys.len() {
        for j in (i + 1)..keys.len() {
            let (src, dst) = (&keys[i], &keys[j]);
            let (primary, backups) = find_paths(topo, src, dst);
            let path_count = (if primary.is_empty() { 0 } else { 1 }) + backups.len();
            results.path_redundancy.insert(
                format!("{src}-{dst}"),
                PathRedundancy { primary_path: primary, backup_paths: backups, path_count },
            );
        }
    }

    for key in &keys {
        for neighbor in topo.neighbor_keys(key) {
            if key >= &neighbor {
                continue;
            }
            let Some(edge) = topo.edge(key, &neighbor) else { continue };
            if !edge.is_critical {
                continue;
            }
            let link = format!("{key}-{neighbor}");
            let affected_pairs = simulate_link_failure(topo, key, &neighbor, &keys);
            results.failover_tests.insert(link.clone(), FailoverTest { link, affected_pairs });
        }
    }
    results
}

fn find_paths(topo: &Topology, src: &str, dst: &str) -> (Vec<String>, Vec<Vec<String>>) {
    let Some(primary_idx) = bfs_path(topo, src, dst) else {
        return (Vec::new(), Vec::new());
    };
    let primary: Vec<String> = primary_idx.iter().map(|i| topo.graph[*i].key.clone()).collect();

    let (Some(isrc), Some(idst)) = (topo.node_index(src), topo.node_index(dst)) else {
        return (primary, Vec::new());
    };
    let all_paths = all_simple_paths(topo, isrc, idst, 6);
    let mut backups = Vec::new();
    for path in all_paths {
        let keys: Vec<String> = path.iter().map(|i| topo.graph[*i].key.clone()).collect();
        if keys != primary && backups.len() < 2 {
            backups.push(keys);
        }
    }
    (primary, backups)
}

/// All simple paths between `start` and `end` with at most `cutoff`
/// edges, mirroring `networkx.all_simple_paths(..., cutoff=6)`.
fn all_simple_paths(
    topo: &Topology,
    start: NodeIndex,
    end: NodeIndex,
    cutoff: usize,
) -> Vec<Vec<NodeIndex>> {
    let mut paths = Vec::new();
    let mut stack = vec![start];
    visit(topo, start, end, cutoff, &mut stack, &mut paths);
    paths
}

fn visit(
    topo: &Topology,
    current: NodeIndex,
    end: NodeIndex,
    cutoff: usize,
    stack: &mut Vec<NodeIndex>,
    paths: &mut Vec<Vec<NodeIndex>>,
) {
    if current == end {
        if stack.len() > 1 {
            paths.push(stack.clone());
        }
        return;
    }
    if stack.len() - 1 >= cutoff {
        return;
    }
    for next in topo.graph.neighbors(current) {
        if stack.contains(&next) {
            continue;
        }
        stack.push(next);
        visit(topo, next, end, cutoff, stack, paths);
        stack.pop();
    }
}

fn simulate_link_failure(topo: &Topology, u: &str, v: &str, sample_keys: &[String]) -> usize {
    let Some(edge) = topo.find_edge(u, v) else { return 0 };
    let mut clone = topo.graph.clone();
    clone.remove_edge(edge);

    let mut disconnected = 0;
    let n = sample_keys.len().min(10);
    for i in 0..n {
        for j in (i + 1)..(i + 6).min(sample_keys.len()) {
            let (Some(isrc), Some(idst)) =
                (topo.node_index(&sample_keys[i]), topo.node_index(&sample_keys[j]))
            else {
                continue;
            };
            if bfs_path_in(&clone, isrc, idst).is_none() {
                disconnected += 1;
            }
        }
    }
    disconnected
}

fn bfs_path_in(
    graph: &petgraph::graph::UnGraph<crate::topology::NodeAttr, crate::topology::EdgeAttr>,
    src: NodeIndex,
    dst: NodeIndex,
) -> Option<Vec<NodeIndex>> {
    use std::collections::VecDeque;
    if src == dst {
        return Some(vec![src]);
    }
    let mut visited: HashMap<NodeIndex, NodeIndex> = HashMap::new();
    let mut queue = VecDeque::new();
    queue.push_back(src);
    visited.insert(src, src);
    while let Some(cur) = queue.pop_front() {
        if cur == dst {
            return Some(vec![cur]);
        }
        for next in graph.neighbors(cur) {
            if !visited.contains_key(&next) {
                visited.insert(next, cur);
                queue.push_back(next);
            }
        }
    }
    None
}

fn validate_security(records: &[DeviceRecord]) -> SecurityResults {
    let mut results = SecurityResults::default();
    for record in records {
        results.access_control.insert(record.key.clone(), true);
        results.authentication.insert(record.key.clone(), true);
        results.encryption.insert(record.key.clone(), true);
        let risk = if record.kind == DeviceKind::Host { "medium" } else { "low" };
        results.vulnerability_assessment.insert(record.key.clone(), risk.to_string());
    }
    results
}

fn validate_protocols(records: &[DeviceRecord]) -> ProtocolResults {
    let mut results = ProtocolResults::default();
    for record in records {
        if record.ospf.enabled {
            results.ospf_validation.insert(record.key.clone(), true);
        }
        if record.bgp.enabled {
            results.bgp_validation.insert(record.key.clone(), true);
        }
    }
    results
}

fn analyze_capacity_planning(
    topo: &Topology,
    capacity_report: &CapacityReport,
    rng: &mut impl Rng,
) -> CapacityPlanningResults {
    let bottleneck_links: std::collections::HashSet<&str> =
        capacity_report.bottlenecks.iter().map(|b| b.link.as_str()).collect();

    let mut results = CapacityPlanningResults::default();
    for key in topo.node_keys() {
        results.current_utilization.insert(key.to_string(), rng.gen_range(20.0..60.0));
        let is_bottleneck = bottleneck_links.iter().any(|link| link.contains(key));
        results.bottleneck_analysis.insert(key.to_string(), is_bottleneck);
        results.scaling_recommendations.insert(
            key.to_string(),
            vec!["Monitor utilization trend".to_string()],
        );
    }
    results
}

fn generate_recommendations(
    capacity_report: &CapacityReport,
    redundancy: &RedundancyResults,
) -> Vec<String> {
    let mut recommendations = capacity_report.load_balancing_recommendations.clone();
    if redundancy.path_redundancy.values().any(|p| p.path_count <= 1) {
        recommendations.push("Implement additional redundancy for critical paths".to_string());
    }
    recommendations.push("Review security configurations for compliance".to_string());
    recommendations.push("Schedule regular configuration backups".to_string());
    recommendations
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::parse;
    use crate::topology::build;

    #[test]
    fn baseline_comparison_reports_unavailable() {
        let pc = parse("pc1", "hostname PC1\n");
        let records = vec![pc];
        let topo = build(&records);
        let report = run(&records, &topo);
        match report.baseline_comparison {
            BaselineComparison::Unavailable { status } => {
                assert_eq!(status, "No baseline available");
            }
        }
    }

    #[test]
    fn reachability_matrix_has_no_self_entries() {
        let a = parse("a", "hostname A\ninterface Gi0/0\n ip address 10.0.0.1 255.255.255.0\n");
        let b = parse("b", "hostname B\ninterface Gi0/0\n ip address 10.0.0.2 255.255.255.0\n");
        let records = vec![a, b];
        let topo = build(&records);
        let report = run(&records, &topo);
        assert!(!report.connectivity_tests.reachability_matrix["a"].contains_key("a"));
        assert_eq!(report.connectivity_tests.reachability_matrix["a"]["b"], true);
    }
}
