//! The device record data model produced by [`super::parser::parse`].

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};

/// What kind of device a configuration file describes.
///
/// Replaces the original's stringly-typed `device_type` field with a
/// closed, pattern-matchable variant (spec.md §9's dynamic-dispatch
/// redesign note).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Router,
    Switch,
    Host,
}

impl DeviceKind {
    /// The icon hint used by the topology JSON export.
    pub fn icon_hint(&self) -> &'static str {
        match self {
            DeviceKind::Router => "router",
            DeviceKind::Switch => "switch",
            DeviceKind::Host => "host",
        }
    }
}

impl std::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DeviceKind::Router => "router",
            DeviceKind::Switch => "switch",
            DeviceKind::Host => "host",
        };
        f.write_str(s)
    }
}

/// One advertised OSPF network statement: `network A.B.C.D W.X.Y.Z area <id>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OspfNetwork {
    pub address: Ipv4Addr,
    pub wildcard_mask: Ipv4Addr,
    pub area: String,
}

/// The OSPF routing subrecord.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OspfRecord {
    pub enabled: bool,
    pub router_id: Option<Ipv4Addr>,
    pub networks: Vec<OspfNetwork>,
    pub passive_interfaces: Vec<String>,
    /// Raw value of `auto-cost reference-bandwidth <mbps>`, stored exactly
    /// as the directive's argument (Mbps, unconverted). Never substituted
    /// into the topology builder's cost formula, which always uses the
    /// hard-coded 100 000 kbps constant — see `topology::metrics`.
    pub reference_bandwidth_mbps: Option<u32>,
    pub max_paths: u32,
    /// Area id to the indices (into `networks`) of statements in that area.
    pub areas: BTreeMap<String, Vec<usize>>,
}

impl Default for OspfRecord {
    fn default() -> Self {
        Self {
            enabled: false,
            router_id: None,
            networks: Vec::new(),
            passive_interfaces: Vec::new(),
            reference_bandwidth_mbps: None,
            max_paths: 1,
            areas: BTreeMap::new(),
        }
    }
}

/// One `neighbor A.B.C.D remote-as <asn>` statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BgpNeighbor {
    pub peer_address: Ipv4Addr,
    pub remote_as: u32,
}

/// The BGP routing subrecord.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BgpRecord {
    pub enabled: bool,
    pub local_as: Option<u32>,
    pub router_id: Option<Ipv4Addr>,
    pub neighbors: Vec<BgpNeighbor>,
    pub advertised_networks: Vec<Ipv4Net>,
}

/// A static route. The grammar in §4.1 only recognizes the default-route
/// form (`ip route 0.0.0.0 0.0.0.0 <next-hop>`), which is captured
/// separately as [`DeviceRecord::default_gateway`]; this list exists for
/// data-model completeness (as in the original) and stays empty unless a
/// future directive populates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticRoute {
    pub destination: Ipv4Net,
    pub next_hop: Ipv4Addr,
}

/// Spanning-tree configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpanningTreeConfig {
    pub mode: Option<String>,
    pub priorities: BTreeMap<u16, u32>,
    pub root_bridge: bool,
}

/// One VLAN table entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VlanEntry {
    pub id: u16,
    pub name: String,
    pub state: VlanState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VlanState {
    Active,
    Suspended,
}

/// One interface record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceRecord {
    /// Canonical interface name, e.g. `GigabitEthernet0/0`.
    pub name: String,
    pub ip_address: Option<Ipv4Addr>,
    pub subnet_mask: Option<Ipv4Addr>,
    pub description: String,
    pub bandwidth_kbps: u64,
    pub mtu: u32,
    pub duplex: String,
    pub speed: String,
    /// `true` unless lowered by `shutdown`.
    pub admin_up: bool,
    pub switchport_mode: Option<String>,
    pub access_vlan: Option<u16>,
    pub trunk_vlans: Vec<u16>,
    pub native_vlan: Option<u16>,
    pub spanning_tree_cost: Option<u32>,
    pub load_interval: u32,
    /// Set to `true` after parsing once the owning device's kind is known
    /// to be [`DeviceKind::Host`]; used by the subnet-adjacency pass to
    /// skip host-to-host edges.
    pub is_host_segment: bool,
}

impl InterfaceRecord {
    /// Construct a new interface record with the bandwidth/MTU defaults
    /// documented in §3, keyed off the (already normalized) interface name.
    pub fn new(name: String) -> Self {
        let bandwidth_kbps = default_bandwidth_kbps(&name);
        Self {
            name,
            ip_address: None,
            subnet_mask: None,
            description: String::new(),
            bandwidth_kbps,
            mtu: 1500,
            duplex: "auto".to_string(),
            speed: "auto".to_string(),
            admin_up: true,
            switchport_mode: None,
            access_vlan: None,
            trunk_vlans: Vec::new(),
            native_vlan: None,
            spanning_tree_cost: None,
            load_interval: 300,
            is_host_segment: false,
        }
    }

    /// Whether this interface carries a usable, administratively-up
    /// address/mask pair — the gate used throughout C2/C3.
    pub fn is_addressed_and_up(&self) -> bool {
        self.admin_up && self.ip_address.is_some() && self.subnet_mask.is_some()
    }
}

/// Default bandwidth (kbps) by interface family, per §3.
pub fn default_bandwidth_kbps(name: &str) -> u64 {
    let lower = name.to_ascii_lowercase();
    if lower.contains("gigabitethernet") {
        1_000_000
    } else if lower.contains("fastethernet") {
        100_000
    } else if lower.contains("serial") {
        1_544
    } else if lower.contains("loopback") {
        8_000_000
    } else {
        10_000
    }
}

/// A single parsed configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Filename stem; the stable key used everywhere a device must be
    /// referenced (topology node key, simulation agent id, ...).
    pub key: String,
    pub hostname: Option<String>,
    pub kind: DeviceKind,
    pub software_version: Option<String>,
    pub interfaces: Vec<InterfaceRecord>,
    pub vlans: Vec<VlanEntry>,
    pub ospf: OspfRecord,
    pub bgp: BgpRecord,
    pub static_routes: Vec<StaticRoute>,
    pub spanning_tree: SpanningTreeConfig,
    /// Raw text of `ip route 0.0.0.0 0.0.0.0 <next-hop>`'s next-hop
    /// field. Kept as a raw string (not parsed eagerly) because the
    /// validator must be able to report "invalid gateway address format"
    /// separately from "unreachable gateway".
    pub default_gateway: Option<String>,
    pub access_lists: Vec<String>,
}

impl DeviceRecord {
    /// Construct the minimal error record used when a configuration file
    /// cannot be read at all (§4.1 Failures / §7 File-IO).
    pub fn error(stem: &str) -> Self {
        Self {
            key: stem.to_string(),
            hostname: Some(format!("error_{stem}")),
            kind: DeviceKind::Host,
            software_version: None,
            interfaces: Vec::new(),
            vlans: Vec::new(),
            ospf: OspfRecord::default(),
            bgp: BgpRecord::default(),
            static_routes: Vec::new(),
            spanning_tree: SpanningTreeConfig::default(),
            default_gateway: None,
            access_lists: Vec::new(),
        }
    }

    /// Look up an interface by its (already normalized) name.
    pub fn interface(&self, name: &str) -> Option<&InterfaceRecord> {
        self.interfaces.iter().find(|i| i.name == name)
    }

    /// All interface networks (`ip_network(address, mask)`), skipping
    /// unaddressed or administratively-down interfaces.
    pub fn interface_networks(&self) -> impl Iterator<Item = Ipv4Net> + '_ {
        self.interfaces.iter().filter_map(|iface| {
            if !iface.is_addressed_and_up() {
                return None;
            }
            let addr = iface.ip_address?;
            let mask = iface.subnet_mask?;
            Ipv4Net::with_netmask(addr, mask).ok()
        })
    }
}
