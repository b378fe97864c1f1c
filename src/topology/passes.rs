//! The four edge-discovery passes, run in order with first-writer-wins
//! semantics: a pass never touches a pair that an earlier pass already
//! linked.

use std::collections::HashMap;
use std::net::Ipv4Addr;

use ipnet::Ipv4Net;
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

use crate::config::DeviceRecord;

use super::{ospf_cost, EdgeAttr, LinkType, Topology};

/// Pass 1: group every up, addressed interface by its enclosing network
/// (host bits allowed — `ipnet`'s `trunc()` mirrors Python's
/// `ip_network(..., strict=False)`). Every group with ≥2 devices gets one
/// edge per unordered device pair not already linked.
pub fn discover_ip_subnet_links(topo: &mut Topology, records: &[DeviceRecord]) {
    struct Entry<'a> {
        dev: &'a str,
        bandwidth_kbps: u64,
        iface_name: &'a str,
    }

    let mut by_network: HashMap<String, Vec<Entry>> = HashMap::new();

    for record in records {
        for iface in &record.interfaces {
            if !iface.is_addressed_and_up() {
                continue;
            }
            let (Some(addr), Some(mask)) = (iface.ip_address, iface.subnet_mask) else {
                continue;
            };
            let Ok(net) = Ipv4Net::with_netmask(addr, mask) else {
                continue;
            };
            let key = net.trunc().to_string();
            by_network.entry(key).or_default().push(Entry {
                dev: &record.key,
                bandwidth_kbps: iface.bandwidth_kbps,
                iface_name: &iface.name,
            });
        }
    }

    for (subnet, entries) in by_network {
        if entries.len() < 2 {
            continue;
        }
        for i in 0..entries.len() {
            for j in (i + 1)..entries.len() {
                let (e1, e2) = (&entries[i], &entries[j]);
                if e1.dev == e2.dev {
                    continue;
                }
                if topo.has_edge(e1.dev, e2.dev) {
                    continue;
                }
                let bandwidth_kbps = e1.bandwidth_kbps.min(e2.bandwidth_kbps);
                let cost = ospf_cost(bandwidth_kbps);
                let mut attr = EdgeAttr::new(LinkType::Subnet, bandwidth_kbps);
                attr.subnet = Some(subnet.clone());
                attr.cost = Some(cost);
                debug!(
                    "subnet edge {}—{} via {}/{} (subnet {subnet}, bw {bandwidth_kbps} kbps, cost {cost})",
                    e1.dev, e2.dev, e1.iface_name, e2.iface_name
                );
                add_edge(topo, e1.dev, e2.dev, attr);
            }
        }
    }
}

/// Pass 2: every pair of OSPF-enabled devices not yet linked gets an
/// `ospf` edge if any of their interface networks overlap.
pub fn discover_ospf_links(topo: &mut Topology, records: &[DeviceRecord]) {
    let ospf_devices: Vec<&DeviceRecord> = records.iter().filter(|r| r.ospf.enabled).collect();

    for i in 0..ospf_devices.len() {
        for j in (i + 1)..ospf_devices.len() {
            let (a, b) = (ospf_devices[i], ospf_devices[j]);
            if topo.has_edge(&a.key, &b.key) {
                continue;
            }
            if have_shared_subnet(a, b) {
                let mut attr = EdgeAttr::new(LinkType::Ospf, 0);
                attr.cost = Some(1);
                add_edge(topo, &a.key, &b.key, attr);
            }
        }
    }
}

fn have_shared_subnet(a: &DeviceRecord, b: &DeviceRecord) -> bool {
    let nets_a: Vec<Ipv4Net> = a.interface_networks().map(|n| n.trunc()).collect();
    let nets_b: Vec<Ipv4Net> = b.interface_networks().map(|n| n.trunc()).collect();
    nets_a
        .iter()
        .any(|na| nets_b.iter().any(|nb| na.contains(nb) || nb.contains(na)))
}

/// Pass 3: for every `neighbor A.B.C.D remote-as R` statement, find the
/// device owning an interface addressed `A.B.C.D` and link them.
pub fn discover_bgp_links(topo: &mut Topology, records: &[DeviceRecord]) {
    let mut by_address: HashMap<Ipv4Addr, &str> = HashMap::new();
    for record in records {
        for iface in &record.interfaces {
            if let Some(addr) = iface.ip_address {
                by_address.entry(addr).or_insert(&record.key);
            }
        }
    }

    for record in records {
        if !record.bgp.enabled {
            continue;
        }
        for neighbor in &record.bgp.neighbors {
            let Some(&peer_key) = by_address.get(&neighbor.peer_address) else {
                continue;
            };
            if peer_key == record.key || topo.has_edge(&record.key, peer_key) {
                continue;
            }
            let mut attr = EdgeAttr::new(LinkType::Bgp, 0);
            attr.peer_address = Some(neighbor.peer_address);
            attr.local_as = record.bgp.local_as;
            attr.remote_as = Some(neighbor.remote_as);
            add_edge(topo, &record.key, peer_key, attr);
        }
    }
}

lazy_static! {
    static ref DESCRIPTION_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)\bto\s+(\w+)").unwrap(),
        Regex::new(r"(?i)\blink\s+to\s+(\w+)").unwrap(),
        Regex::new(r"(?i)\bconnected to\s+(\w+)").unwrap(),
        Regex::new(r"(?i)(\w+)\s+(?:link|connection|interface)").unwrap(),
    ];
}

/// Pass 4: scan interface descriptions for a peer-name token and link to
/// that device if the token matches an existing node key.
pub fn discover_description_links(topo: &mut Topology, records: &[DeviceRecord]) {
    for record in records {
        'iface: for iface in &record.interfaces {
            if iface.description.is_empty() {
                continue;
            }
            for pattern in DESCRIPTION_PATTERNS.iter() {
                let Some(caps) = pattern.captures(&iface.description) else {
                    continue;
                };
                let Some(peer) = caps.get(1) else { continue };
                let peer = peer.as_str();
                if topo.node_index(peer).is_some()
                    && peer != record.key
                    && !topo.has_edge(&record.key, peer)
                {
                    let attr = EdgeAttr::new(LinkType::Description, 0);
                    add_edge(topo, &record.key, peer, attr);
                    continue 'iface;
                }
            }
        }
    }
}

fn add_edge(topo: &mut Topology, a: &str, b: &str, attr: EdgeAttr) {
    if let (Some(ia), Some(ib)) = (topo.node_index(a), topo.node_index(b)) {
        topo.graph.add_edge(ia, ib, attr);
    }
}
