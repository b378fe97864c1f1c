//! Traffic Analyzer (C4): synthesizes offered load per host, attributes
//! it to shortest paths, and reports bottlenecks with alternate-path
//! probes.
//!
//! Grounded in `traffic_analyzer.py`'s `analyze_capacity` pipeline; the
//! application-profile table and jitter ranges are taken verbatim from
//! its `app_profiles` dict and `_simulate_endpoint_traffic`.

use std::collections::{HashMap, VecDeque};

use petgraph::graph::NodeIndex;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::DeviceKind;
use crate::topology::Topology;

#[derive(Debug, Clone, Copy)]
struct AppProfile {
    name: &'static str,
    peak_mbps: f64,
    regular_mbps: f64,
}

const APP_PROFILES: &[AppProfile] = &[
    AppProfile { name: "web", peak_mbps: 100.0, regular_mbps: 20.0 },
    AppProfile { name: "database", peak_mbps: 500.0, regular_mbps: 50.0 },
    AppProfile { name: "file-server", peak_mbps: 1000.0, regular_mbps: 100.0 },
    AppProfile { name: "video", peak_mbps: 50.0, regular_mbps: 25.0 },
    AppProfile { name: "voip", peak_mbps: 10.0, regular_mbps: 5.0 },
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EndpointLoad {
    pub peak_load_mbps: f64,
    pub regular_load_mbps: f64,
    pub applications: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkUtilization {
    pub capacity_mbps: f64,
    pub regular_traffic_mbps: f64,
    pub peak_traffic_mbps: f64,
    pub regular_utilization_percent: f64,
    pub peak_utilization_percent: f64,
    pub link_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bottleneck {
    pub link: String,
    pub utilization_percent: f64,
    pub capacity_mbps: f64,
    pub severity: Severity,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CapacityReport {
    pub endpoint_traffic: HashMap<String, EndpointLoad>,
    pub link_utilization: HashMap<String, LinkUtilization>,
    pub bottlenecks: Vec<Bottleneck>,
    pub load_balancing_recommendations: Vec<String>,
}

/// Run the full analysis: synthesize endpoint loads, attribute them to
/// shortest paths, compute per-edge utilization, and report bottlenecks
/// plus alternate-path recommendations.
pub fn analyze_capacity(topo: &Topology) -> CapacityReport {
    let mut rng = rand::thread_rng();
    let endpoint_traffic = simulate_endpoint_traffic(topo, &mut rng);
    let link_utilization = calculate_link_utilization(topo, &endpoint_traffic);
    let bottlenecks = identify_bottlenecks(&link_utilization);
    let load_balancing_recommendations = generate_recommendations(topo, &bottlenecks);

    CapacityReport {
        endpoint_traffic,
        link_utilization,
        bottlenecks,
        load_balancing_recommendations,
    }
}

fn simulate_endpoint_traffic(
    topo: &Topology,
    rng: &mut impl Rng,
) -> HashMap<String, EndpointLoad> {
    let mut traffic = HashMap::new();
    for node in topo.graph.node_weights() {
        if node.kind != DeviceKind::Host {
            continue;
        }
        let count = rng.gen_range(1..=3);
        let mut shuffled: Vec<&AppProfile> = APP_PROFILES.iter().collect();
        shuffled.shuffle(rng);
        let chosen: Vec<&AppProfile> = shuffled.into_iter().take(count).collect();

        let mut peak = 0.0;
        let mut regular = 0.0;
        for profile in &chosen {
            peak += profile.peak_mbps * rng.gen_range(0.7..1.0);
            regular += profile.regular_mbps * rng.gen_range(0.8..1.0);
        }

        traffic.insert(
            node.key.clone(),
            EndpointLoad {
                peak_load_mbps: peak,
                regular_load_mbps: regular,
                applications: chosen.iter().map(|p| p.name.to_string()).collect(),
            },
        );
    }
    traffic
}

fn bfs_shortest_path_in(
    graph: &petgraph::graph::UnGraph<crate::topology::NodeAttr, crate::topology::EdgeAttr>,
    src: NodeIndex,
    dst: NodeIndex,
) -> Option<Vec<NodeIndex>> {
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
        for next in graph.neighbors(cur) {
            if !visited.contains_key(&next) {
                visited.insert(next, cur);
                queue.push_back(next);
            }
        }
    }
    None
}

fn bfs_shortest_path(topo: &Topology, src: NodeIndex, dst: NodeIndex) -> Option<Vec<NodeIndex>> {
    bfs_shortest_path_in(&topo.graph, src, dst)
}

fn calculate_link_utilization(
    topo: &Topology,
    endpoint_loads: &HashMap<String, EndpointLoad>,
) -> HashMap<String, LinkUtilization> {
    let hosts: Vec<NodeIndex> = topo
        .graph
        .node_indices()
        .filter(|i| topo.graph[*i].kind == DeviceKind::Host)
        .collect();

    // For each ordered host pair, 10% of the source's load lands on
    // every edge along the shortest path, per §4.4.
    let mut edge_traffic: HashMap<(NodeIndex, NodeIndex), (f64, f64)> = HashMap::new();
    for &src in &hosts {
        for &dst in &hosts {
            if src == dst {
                continue;
            }
            let Some(path) = bfs_shortest_path(topo, src, dst) else {
                continue;
            };
            let Some(load) = endpoint_loads.get(&topo.graph[src].key) else {
                continue;
            };
            for window in path.windows(2) {
                let key = normalize_pair(window[0], window[1]);
                let entry = edge_traffic.entry(key).or_insert((0.0, 0.0));
                entry.0 += load.regular_load_mbps * 0.1;
                entry.1 += load.peak_load_mbps * 0.1;
            }
        }
    }

    let mut result = HashMap::new();
    for edge in topo.graph.edge_indices() {
        let (a, b) = topo.graph.edge_endpoints(edge).expect("edge exists");
        let attr = &topo.graph[edge];
        let capacity_mbps = if attr.bandwidth_kbps > 0 {
            attr.bandwidth_kbps as f64 / 1000.0
        } else {
            100.0
        };
        let (regular, peak) = edge_traffic
            .get(&normalize_pair(a, b))
            .copied()
            .unwrap_or((0.0, 0.0));

        let key = format!("{}-{}", topo.graph[a].key, topo.graph[b].key);
        result.insert(
            key,
            LinkUtilization {
                capacity_mbps,
                regular_traffic_mbps: regular,
                peak_traffic_mbps: peak,
                regular_utilization_percent: ((regular / capacity_mbps) * 100.0).min(100.0),
                peak_utilization_percent: ((peak / capacity_mbps) * 100.0).min(100.0),
                link_type: attr.link_type.to_string(),
            },
        );
    }
    result
}

fn normalize_pair(a: NodeIndex, b: NodeIndex) -> (NodeIndex, NodeIndex) {
    if a.index() <= b.index() {
        (a, b)
    } else {
        (b, a)
    }
}

fn identify_bottlenecks(link_utilization: &HashMap<String, LinkUtilization>) -> Vec<Bottleneck> {
    let mut bottlenecks = Vec::new();
    for (link, util) in link_utilization {
        if util.peak_utilization_percent > 80.0 {
            bottlenecks.push(Bottleneck {
                link: link.clone(),
                utilization_percent: util.peak_utilization_percent,
                capacity_mbps: util.capacity_mbps,
                severity: if util.peak_utilization_percent > 95.0 {
                    Severity::Critical
                } else {
                    Severity::High
                },
            });
        } else if util.regular_utilization_percent > 60.0 {
            bottlenecks.push(Bottleneck {
                link: link.clone(),
                utilization_percent: util.regular_utilization_percent,
                capacity_mbps: util.capacity_mbps,
                severity: Severity::Medium,
            });
        }
    }
    bottlenecks
}

fn generate_recommendations(topo: &Topology, bottlenecks: &[Bottleneck]) -> Vec<String> {
    let mut recommendations = Vec::new();
    for bottleneck in bottlenecks {
        let Some((u, v)) = bottleneck.link.split_once('-') else {
            continue;
        };
        let has_alternate = has_alternate_path(topo, u, v);
        if has_alternate {
            recommendations.push(format!(
                "Activate alternative paths for {} to distribute load; consider ECMP (Equal-Cost Multi-Path) routing",
                bottleneck.link
            ));
        } else {
            recommendations.push(format!(
                "Upgrade bandwidth capacity for critical link {} - no alternative paths available",
                bottleneck.link
            ));
        }
        if bottleneck.severity == Severity::Critical {
            recommendations.push(format!(
                "URGENT: implement traffic shaping on {} to prioritize critical applications",
                bottleneck.link
            ));
        }
    }
    recommendations
}

/// Whether an alternate simple path (≤6 hops) exists between `u` and `v`
/// after temporarily removing the direct edge.
fn has_alternate_path(topo: &Topology, u: &str, v: &str) -> bool {
    let Some(edge) = topo.find_edge(u, v) else {
        return false;
    };
    let (Some(iu), Some(iv)) = (topo.node_index(u), topo.node_index(v)) else {
        return false;
    };
    let mut clone = topo.graph.clone();
    clone.remove_edge(edge);
    bfs_shortest_path_in(&clone, iu, iv)
        .map(|path| path.len() <= 7)
        .unwrap_or(false)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::parse;
    use crate::topology::build;

    #[test]
    fn endpoint_traffic_only_synthesized_for_hosts() {
        let pc = parse(
            "pc1",
            "hostname PC1\ninterface Fa0/0\n ip address 192.168.1.10 255.255.255.0\n",
        );
        let sw = parse("sw1", "hostname SW1\ninterface Fa0/0\n switchport mode access\n");
        let records = vec![pc, sw];
        let topo = build(&records);
        let report = analyze_capacity(&topo);
        assert!(report.endpoint_traffic.contains_key("pc1"));
        assert!(!report.endpoint_traffic.contains_key("sw1"));
    }
}
