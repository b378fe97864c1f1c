//! The line-oriented configuration parser (C1).
//!
//! Grounded in `cisco-lab/src/router/session/ospf.rs`'s directive-by-line
//! style, adapted from "drive a live router session" to "fold a static
//! text block into a record". Unknown lines are ignored; malformed
//! numeric/address tokens leave the field at its default rather than
//! aborting the parse, per §4.1.

use std::net::Ipv4Addr;

use log::warn;

use super::device::{
    BgpNeighbor, BgpRecord, DeviceKind, DeviceRecord, InterfaceRecord, OspfNetwork, OspfRecord,
    VlanEntry, VlanState,
};
use super::normalize::normalize_interface_name;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    None,
    Ospf,
    Bgp,
}

/// Parse one configuration file's text into a [`DeviceRecord`] keyed by
/// `stem` (the filename stem, case preserved, per §6).
pub fn parse(stem: &str, text: &str) -> DeviceRecord {
    let mut hostname: Option<String> = None;
    let mut software_version: Option<String> = None;
    let mut interfaces: Vec<InterfaceRecord> = Vec::new();
    let mut vlans: Vec<VlanEntry> = Vec::new();
    let mut ospf = OspfRecord::default();
    let mut bgp = BgpRecord::default();
    let mut spanning_tree = super::device::SpanningTreeConfig::default();
    let mut access_lists: Vec<String> = Vec::new();
    let mut default_gateway: Option<String> = None;

    let mut current_interface: Option<InterfaceRecord> = None;
    let mut mode = Mode::None;

    let close_interface = |current_interface: &mut Option<InterfaceRecord>,
                            interfaces: &mut Vec<InterfaceRecord>| {
        if let Some(iface) = current_interface.take() {
            if interfaces.iter().any(|i| i.name == iface.name) {
                warn!(
                    "{stem}: duplicate interface {} ignored",
                    iface.name
                );
            } else {
                interfaces.push(iface);
            }
        }
    };

    for raw_line in text.lines() {
        let is_indented = raw_line.starts_with(' ') || raw_line.starts_with('\t');
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('!') {
            continue;
        }

        if !is_indented {
            // A new top-level directive closes any open interface/mode block.
            close_interface(&mut current_interface, &mut interfaces);
            mode = Mode::None;
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }

        if !is_indented {
            match tokens[0] {
                "version" if tokens.len() >= 2 => {
                    software_version = Some(tokens[1].to_string());
                }
                "hostname" if tokens.len() >= 2 => {
                    hostname = Some(tokens[1].to_string());
                }
                "interface" if tokens.len() >= 2 => {
                    let name = normalize_interface_name(tokens[1]);
                    current_interface = Some(InterfaceRecord::new(name));
                }
                "router" if tokens.len() >= 2 && tokens[1] == "ospf" => {
                    ospf.enabled = true;
                    mode = Mode::Ospf;
                }
                "router" if tokens.len() >= 2 && tokens[1] == "bgp" => {
                    bgp.enabled = true;
                    mode = Mode::Bgp;
                    if tokens.len() >= 3 {
                        bgp.local_as = tokens[2].parse().ok();
                    }
                }
                "vlan" if tokens.len() >= 2 => {
                    if let Ok(id) = tokens[1].parse::<u16>() {
                        vlans.push(VlanEntry {
                            id,
                            name: format!("VLAN{id}"),
                            state: VlanState::Active,
                        });
                    } else {
                        warn!("{stem}: malformed vlan id {:?} ignored", tokens[1]);
                    }
                }
                "ip" if tokens.len() >= 5 && tokens[1] == "route" => {
                    if tokens[2] == "0.0.0.0" && tokens[3] == "0.0.0.0" {
                        default_gateway = Some(tokens[4].to_string());
                    }
                }
                "spanning-tree" if tokens.len() >= 3 && tokens[1] == "mode" => {
                    spanning_tree.mode = Some(tokens[2].to_string());
                }
                "spanning-tree"
                    if tokens.len() >= 5 && tokens[1] == "vlan" && tokens[3] == "priority" =>
                {
                    if let (Ok(id), Ok(priority)) =
                        (tokens[2].parse::<u16>(), tokens[4].parse::<u32>())
                    {
                        spanning_tree.priorities.insert(id, priority);
                    }
                }
                "access-list" => {
                    access_lists.push(line.to_string());
                }
                "ip" if tokens.len() >= 2 && tokens[1] == "access-list" => {
                    access_lists.push(line.to_string());
                }
                _ => {}
            }
            continue;
        }

        // Indented: applies to the currently open interface, or the
        // currently open routing mode.
        if let Some(iface) = current_interface.as_mut() {
            apply_interface_directive(stem, iface, &tokens, line);
            continue;
        }

        match mode {
            Mode::Ospf => apply_ospf_directive(&mut ospf, &tokens),
            Mode::Bgp => apply_bgp_directive(&mut bgp, &tokens),
            Mode::None => {}
        }
    }

    close_interface(&mut current_interface, &mut interfaces);

    let kind = derive_kind(&interfaces, &ospf, &bgp);
    for iface in interfaces.iter_mut() {
        iface.is_host_segment = kind == DeviceKind::Host;
    }

    DeviceRecord {
        key: stem.to_string(),
        hostname,
        kind,
        software_version,
        interfaces,
        vlans,
        ospf,
        bgp,
        static_routes: Vec::new(),
        spanning_tree,
        default_gateway,
        access_lists,
    }
}

fn apply_interface_directive(
    stem: &str,
    iface: &mut InterfaceRecord,
    tokens: &[&str],
    line: &str,
) {
    match tokens.first().copied() {
        Some("ip") if tokens.len() >= 4 && tokens[1] == "address" => {
            match (tokens[2].parse::<Ipv4Addr>(), tokens[3].parse::<Ipv4Addr>()) {
                (Ok(addr), Ok(mask)) => {
                    iface.ip_address = Some(addr);
                    iface.subnet_mask = Some(mask);
                }
                _ => {
                    warn!("{stem}: invalid ip address on {}: {line:?}", iface.name);
                }
            }
        }
        Some("description") => {
            iface.description = tokens[1..].join(" ");
        }
        Some("bandwidth") if tokens.len() >= 2 => {
            if let Ok(kbps) = tokens[1].parse::<u64>() {
                iface.bandwidth_kbps = kbps;
            } else {
                warn!("{stem}: malformed bandwidth on {}: {line:?}", iface.name);
            }
        }
        Some("mtu") if tokens.len() >= 2 => {
            if let Ok(mtu) = tokens[1].parse::<u32>() {
                iface.mtu = mtu;
            } else {
                warn!("{stem}: malformed mtu on {}: {line:?}", iface.name);
            }
        }
        Some("shutdown") => iface.admin_up = false,
        Some("no") if tokens.get(1) == Some(&"shutdown") => iface.admin_up = true,
        Some("duplex") if tokens.len() >= 2 => iface.duplex = tokens[1].to_string(),
        Some("speed") if tokens.len() >= 2 => iface.speed = tokens[1].to_string(),
        Some("load-interval") if tokens.len() >= 2 => {
            if let Ok(n) = tokens[1].parse::<u32>() {
                iface.load_interval = n;
            }
        }
        Some("switchport") if tokens.get(1) == Some(&"mode") && tokens.len() >= 3 => {
            iface.switchport_mode = Some(tokens[2].to_string());
        }
        Some("switchport")
            if tokens.get(1) == Some(&"access") && tokens.get(2) == Some(&"vlan") =>
        {
            if let Some(id) = tokens.get(3).and_then(|t| t.parse::<u16>().ok()) {
                iface.access_vlan = Some(id);
            }
        }
        Some("switchport")
            if tokens.get(1) == Some(&"trunk")
                && tokens.get(2) == Some(&"native")
                && tokens.get(3) == Some(&"vlan") =>
        {
            if let Some(id) = tokens.get(4).and_then(|t| t.parse::<u16>().ok()) {
                iface.native_vlan = Some(id);
            }
        }
        Some("switchport")
            if tokens.get(1) == Some(&"trunk")
                && tokens.get(2) == Some(&"allowed")
                && tokens.get(3) == Some(&"vlan") =>
        {
            iface.trunk_vlans = tokens[4..]
                .join("")
                .split(',')
                .filter_map(|t| t.parse::<u16>().ok())
                .collect();
        }
        Some("spanning-tree") if tokens.get(1) == Some(&"cost") => {
            if let Some(cost) = tokens.get(2).and_then(|t| t.parse::<u32>().ok()) {
                iface.spanning_tree_cost = Some(cost);
            }
        }
        _ => {}
    }
}

fn apply_ospf_directive(ospf: &mut OspfRecord, tokens: &[&str]) {
    match tokens.first().copied() {
        Some("router-id") if tokens.len() >= 2 => {
            ospf.router_id = tokens[1].parse().ok();
        }
        Some("network") if tokens.len() >= 5 && tokens[3] == "area" => {
            match (tokens[1].parse::<Ipv4Addr>(), tokens[2].parse::<Ipv4Addr>()) {
                (Ok(address), Ok(wildcard_mask)) => {
                    let area = tokens[4].to_string();
                    let idx = ospf.networks.len();
                    ospf.networks.push(OspfNetwork {
                        address,
                        wildcard_mask,
                        area: area.clone(),
                    });
                    ospf.areas.entry(area).or_default().push(idx);
                }
                _ => {}
            }
        }
        Some("auto-cost")
            if tokens.len() >= 3 && tokens[1] == "reference-bandwidth" =>
        {
            // Stored verbatim as Mbps, per §4.1/§9 — never converted and
            // never fed into the cost formula, which always uses a
            // hard-coded 100 000 kbps constant (see topology::metrics).
            ospf.reference_bandwidth_mbps = tokens[2].parse().ok();
        }
        Some("passive-interface") if tokens.len() >= 2 => {
            ospf.passive_interfaces
                .push(normalize_interface_name(tokens[1]));
        }
        Some("maximum-paths") if tokens.len() >= 2 => {
            if let Ok(n) = tokens[1].parse::<u32>() {
                ospf.max_paths = n;
            }
        }
        _ => {}
    }
}

fn apply_bgp_directive(bgp: &mut BgpRecord, tokens: &[&str]) {
    match tokens.first().copied() {
        Some("neighbor") if tokens.len() >= 4 && tokens[2] == "remote-as" => {
            if let Ok(peer_address) = tokens[1].parse::<Ipv4Addr>() {
                if let Ok(remote_as) = tokens[3].parse::<u32>() {
                    bgp.neighbors.push(BgpNeighbor {
                        peer_address,
                        remote_as,
                    });
                }
            }
        }
        Some("router-id") if tokens.len() >= 2 => {
            bgp.router_id = tokens[1].parse().ok();
        }
        Some("network") if tokens.len() >= 2 => {
            if let Ok(net) = tokens[1].parse() {
                bgp.advertised_networks.push(net);
            }
        }
        _ => {}
    }
}

fn derive_kind(interfaces: &[InterfaceRecord], ospf: &OspfRecord, bgp: &BgpRecord) -> DeviceKind {
    if interfaces.iter().any(|i| i.switchport_mode.is_some()) {
        DeviceKind::Switch
    } else if ospf.enabled || bgp.enabled {
        DeviceKind::Router
    } else {
        DeviceKind::Host
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_router_with_ospf() {
        let cfg = "\
hostname R1
!
interface GigabitEthernet0/0
 description to R2
 ip address 10.0.0.1 255.255.255.252
!
router ospf 1
 router-id 1.1.1.1
 network 10.0.0.0 0.0.0.3 area 0
";
        let rec = parse("r1", cfg);
        assert_eq!(rec.hostname.as_deref(), Some("R1"));
        assert_eq!(rec.kind, DeviceKind::Router);
        assert_eq!(rec.interfaces.len(), 1);
        assert_eq!(rec.interfaces[0].name, "GigabitEthernet0/0");
        assert_eq!(
            rec.interfaces[0].ip_address,
            Some("10.0.0.1".parse().unwrap())
        );
        assert!(rec.ospf.enabled);
        assert_eq!(rec.ospf.networks.len(), 1);
        assert_eq!(rec.ospf.networks[0].area, "0");
    }

    #[test]
    fn bgp_neighbor_uses_fourth_token_as_remote_as() {
        let cfg = "\
hostname R1
router bgp 65001
 neighbor 10.0.0.2 remote-as 65002
";
        let rec = parse("r1", cfg);
        assert_eq!(rec.bgp.neighbors.len(), 1);
        assert_eq!(rec.bgp.neighbors[0].remote_as, 65002);
    }

    #[test]
    fn shutdown_lowers_admin_status() {
        let cfg = "\
interface FastEthernet0/1
 shutdown
";
        let rec = parse("r1", cfg);
        assert!(!rec.interfaces[0].admin_up);
    }

    #[test]
    fn unreadable_directives_are_ignored_not_fatal() {
        let cfg = "\
hostname R1
bogus-directive something
interface Gi0/0
 mtu not-a-number
 ip address 10.0.0.1 255.255.255.0
";
        let rec = parse("r1", cfg);
        assert_eq!(rec.interfaces[0].mtu, 1500);
        assert!(rec.interfaces[0].ip_address.is_some());
    }

    #[test]
    fn duplicate_interface_name_is_skipped() {
        let cfg = "\
interface Gi0/0
 ip address 10.0.0.1 255.255.255.0
interface Gi0/0
 ip address 10.0.0.2 255.255.255.0
";
        let rec = parse("r1", cfg);
        assert_eq!(rec.interfaces.len(), 1);
        assert_eq!(
            rec.interfaces[0].ip_address,
            Some("10.0.0.1".parse().unwrap())
        );
    }

    #[test]
    fn host_kind_when_no_switchport_ospf_bgp() {
        let cfg = "\
hostname PC1
interface FastEthernet0/0
 ip address 192.168.1.10 255.255.255.0
";
        let rec = parse("pc1", cfg);
        assert_eq!(rec.kind, DeviceKind::Host);
        assert!(rec.interfaces[0].is_host_segment);
    }

    #[test]
    fn parse_is_deterministic_and_whitespace_insensitive() {
        let cfg = "\
hostname R1
interface Gi0/0
 description to R2
 ip address 10.0.0.1 255.255.255.252
router ospf 1
 router-id 1.1.1.1
 network 10.0.0.0 0.0.0.3 area 0
";
        let padded = "\

hostname R1

interface Gi0/0
 description to R2
 ip address   10.0.0.1   255.255.255.252

router ospf 1
 router-id 1.1.1.1
 network 10.0.0.0 0.0.0.3 area 0

";
        assert_eq!(parse("r1", cfg), parse("r1", cfg));
        assert_eq!(parse("r1", cfg), parse("r1", padded));
    }
}
