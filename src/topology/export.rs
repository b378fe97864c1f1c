//! JSON export of the topology graph, to the shape fixed by §6:
//! `{nodes:[...], edges:[...]}`.

use serde::Serialize;

use super::Topology;

#[derive(Debug, Serialize)]
pub struct ExportedGraph {
    pub nodes: Vec<ExportedNode>,
    pub edges: Vec<ExportedEdge>,
}

#[derive(Debug, Serialize)]
pub struct ExportedNode {
    pub id: String,
    pub hostname: Option<String>,
    pub kind: String,
    pub bandwidth_summary: super::BandwidthSummary,
    pub label: String,
    pub icon: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ExportedEdge {
    pub u: String,
    pub v: String,
    pub link_type: String,
    pub subnet: Option<String>,
    pub bandwidth_kbps: u64,
    pub bandwidth_mbps: f64,
    pub cost: Option<u32>,
    pub utilization_percent: f64,
    pub utilization_status: String,
    pub priority: String,
    pub alternative_paths: usize,
    pub is_critical: bool,
}

pub fn export(topo: &Topology) -> ExportedGraph {
    let nodes = topo
        .graph
        .node_weights()
        .map(|n| ExportedNode {
            id: n.key.clone(),
            hostname: n.hostname.clone(),
            kind: n.kind.to_string(),
            bandwidth_summary: n.bandwidth_summary,
            label: n.hostname.clone().unwrap_or_else(|| n.key.clone()),
            icon: n.icon,
        })
        .collect();

    let edges = topo
        .graph
        .edge_indices()
        .map(|e| {
            let (a, b) = topo.graph.edge_endpoints(e).expect("edge exists");
            let attr = &topo.graph[e];
            ExportedEdge {
                u: topo.graph[a].key.clone(),
                v: topo.graph[b].key.clone(),
                link_type: attr.link_type.to_string(),
                subnet: attr.subnet.clone(),
                bandwidth_kbps: attr.bandwidth_kbps,
                bandwidth_mbps: attr.bandwidth_kbps as f64 / 1000.0,
                cost: attr.cost,
                utilization_percent: attr.utilization_percent,
                utilization_status: format!("{:?}", attr.utilization_status).to_lowercase(),
                priority: format!("{:?}", attr.priority).to_lowercase(),
                alternative_paths: attr.alternative_paths,
                is_critical: attr.is_critical,
            }
        })
        .collect();

    ExportedGraph { nodes, edges }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::parse;
    use crate::topology::build;

    #[test]
    fn export_shape_round_trips_through_json() {
        let r1 = parse(
            "r1",
            "hostname R1\ninterface Gi0/0\n ip address 10.0.0.1 255.255.255.252\nrouter ospf 1\n network 10.0.0.0 0.0.0.3 area 0\n",
        );
        let r2 = parse(
            "r2",
            "hostname R2\ninterface Gi0/0\n ip address 10.0.0.2 255.255.255.252\nrouter ospf 1\n network 10.0.0.0 0.0.0.3 area 0\n",
        );
        let topo = build(&[r1, r2]);
        let exported = export(&topo);
        let json = serde_json::to_string(&exported).unwrap();
        assert!(json.contains("\"u\""));
        assert_eq!(exported.nodes.len(), 2);
        assert_eq!(exported.edges.len(), 1);
    }
}
