//! Per-agent statistics, ARP cache, and protocol neighbor tables.
//!
//! These are owned exclusively by their agent; anything handed out to a
//! control-plane client is a snapshot copy, never a reference (§5).

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::message::{mac_to_string, Mac};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArpEntry {
    pub mac: String,
    pub learned_at_secs: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OspfNeighbor {
    pub router_id: String,
    pub last_hello_secs: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BgpSession {
    pub state: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentStatistics {
    pub node_id: String,
    pub uptime_secs: f64,
    pub paused: bool,
    pub messages_sent: u64,
    pub messages_received: u64,
    pub packets_dropped: u64,
    pub arp_cache: HashMap<String, ArpEntry>,
    pub ospf_neighbors: HashMap<String, OspfNeighbor>,
    pub bgp_sessions: HashMap<String, BgpSession>,
}

/// Mutable per-agent state, guarded by a mutex and read out only via
/// [`AgentState::snapshot`].
#[derive(Debug)]
pub struct AgentState {
    pub node_id: String,
    pub started_at: Instant,
    pub messages_sent: u64,
    pub messages_received: u64,
    pub packets_dropped: u64,
    pub arp_cache: HashMap<std::net::Ipv4Addr, (Mac, Instant)>,
    pub ospf_neighbors: HashMap<String, Instant>,
    pub bgp_sessions: HashMap<std::net::Ipv4Addr, String>,
    pub routing_table: Vec<(ipnet::Ipv4Net, std::net::Ipv4Addr)>,
}

impl AgentState {
    pub fn new(node_id: String) -> Self {
        Self {
            node_id,
            started_at: Instant::now(),
            messages_sent: 0,
            messages_received: 0,
            packets_dropped: 0,
            arp_cache: HashMap::new(),
            ospf_neighbors: HashMap::new(),
            bgp_sessions: HashMap::new(),
            routing_table: Vec::new(),
        }
    }

    pub fn snapshot(&self, paused: bool) -> AgentStatistics {
        AgentStatistics {
            node_id: self.node_id.clone(),
            uptime_secs: self.started_at.elapsed().as_secs_f64(),
            paused,
            messages_sent: self.messages_sent,
            messages_received: self.messages_received,
            packets_dropped: self.packets_dropped,
            arp_cache: self
                .arp_cache
                .iter()
                .map(|(ip, (mac, since))| {
                    (
                        ip.to_string(),
                        ArpEntry {
                            mac: mac_to_string(*mac),
                            learned_at_secs: since.elapsed().as_secs_f64(),
                        },
                    )
                })
                .collect(),
            ospf_neighbors: self
                .ospf_neighbors
                .iter()
                .map(|(router_id, since)| {
                    (
                        router_id.clone(),
                        OspfNeighbor {
                            router_id: router_id.clone(),
                            last_hello_secs: since.elapsed().as_secs_f64(),
                        },
                    )
                })
                .collect(),
            bgp_sessions: self
                .bgp_sessions
                .iter()
                .map(|(ip, state)| (ip.to_string(), BgpSession { state: state.clone() }))
                .collect(),
        }
    }

    /// Evict ARP entries older than `ttl` (periodic task, §4.5).
    pub fn evict_stale_arp(&mut self, ttl: Duration) {
        self.arp_cache.retain(|_, (_, since)| since.elapsed() < ttl);
    }
}
