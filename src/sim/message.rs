//! The message shape exchanged between agents (§4.5).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A MAC address, synthesized deterministically from a node key so that
/// Day-1 bring-up can populate ARP caches without a real data-link layer.
pub type Mac = [u8; 6];

pub fn synth_mac(node_key: &str) -> Mac {
    let mut mac = [0u8; 6];
    mac[0] = 0x02; // locally-administered, unicast
    let digest = node_key.as_bytes();
    for (i, byte) in mac.iter_mut().enumerate().skip(1) {
        *byte = digest.get(i).copied().unwrap_or(0).wrapping_add(i as u8);
    }
    mac
}

pub fn mac_to_string(mac: Mac) -> String {
    mac.iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(":")
}

pub const BROADCAST_MAC: Mac = [0xff; 6];

/// Message kinds recognized by an agent's handler dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageKind {
    Arp,
    Ospf,
    Bgp,
    Data,
    LinkFailure,
}

/// One message in flight between two agents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub src_mac: Mac,
    pub dst_mac: Mac,
    pub src_ip: Option<std::net::Ipv4Addr>,
    pub dst_ip: Option<std::net::Ipv4Addr>,
    pub kind: MessageKind,
    pub payload: BTreeMap<String, String>,
    pub timestamp: std::time::Duration,
    pub ttl: u8,
}

impl Message {
    pub fn new(kind: MessageKind, src_mac: Mac, dst_mac: Mac, since_start: std::time::Duration) -> Self {
        Self {
            src_mac,
            dst_mac,
            src_ip: None,
            dst_ip: None,
            kind,
            payload: BTreeMap::new(),
            timestamp: since_start,
            ttl: 64,
        }
    }

    pub fn with_payload(mut self, key: &str, value: impl Into<String>) -> Self {
        self.payload.insert(key.to_string(), value.into());
        self
    }
}
