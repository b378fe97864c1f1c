//! Fault injection: remove/restore an edge in the live topology (§4.5).
//! Both operations are idempotent.

use std::collections::HashMap;
use std::sync::mpsc::SyncSender;
use std::sync::Arc;

use log::info;
use parking_lot::Mutex;

use crate::topology::{EdgeAttr, Topology};

use super::message::{synth_mac, Message, MessageKind};

/// Removed-edge cache so `restore_link` can re-add an edge with its
/// original attributes (cost, utilization, ...) rather than a blank one.
pub type RemovedEdges = Arc<Mutex<HashMap<(String, String), EdgeAttr>>>;

fn edge_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

/// Remove the edge `(a, b)` from the live graph and enqueue a
/// `LINK_FAILURE` message on `a`'s inbound queue describing `b`.
/// Idempotent: a no-op if the edge is already down.
pub fn inject_link_failure(
    topology: &Arc<Mutex<Topology>>,
    removed: &RemovedEdges,
    inbound_tx: &HashMap<String, SyncSender<Message>>,
    a: &str,
    b: &str,
) {
    let attr = {
        let mut topo = topology.lock();
        topo.remove_edge(a, b)
    };
    let Some(attr) = attr else {
        return; // already down: idempotent no-op
    };
    removed.lock().insert(edge_key(a, b), attr);
    info!("fault injection: link {a}—{b} down");

    if let Some(tx) = inbound_tx.get(a) {
        let mac = synth_mac(a);
        let msg = Message::new(MessageKind::LinkFailure, mac, mac, std::time::Duration::ZERO)
            .with_payload("peer", b);
        let _ = tx.try_send(msg);
    }
}

/// Re-add the edge `(a, b)` using its cached pre-failure attributes.
/// Idempotent: a no-op if the edge is already up.
pub fn restore_link(topology: &Arc<Mutex<Topology>>, removed: &RemovedEdges, a: &str, b: &str) {
    let attr = removed.lock().remove(&edge_key(a, b));
    let Some(attr) = attr else {
        return; // already up (or never recorded as down): idempotent no-op
    };
    topology.lock().restore_edge(a, b, attr);
    info!("fault injection: link {a}—{b} restored");
}
