//! The per-node agent: inbound/outbound bounded queues, handler
//! dispatch by message kind, and periodic tasks (§4.5).

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info};
use parking_lot::Mutex;

use crate::config::{DeviceKind, DeviceRecord};
use crate::settings::Settings;
use crate::topology::Topology;

use super::message::{mac_to_string, synth_mac, Mac, Message, MessageKind, BROADCAST_MAC};
use super::stats::AgentState;

/// Handle to a running agent, held by the engine for control-plane
/// operations and shutdown.
pub struct AgentHandle {
    pub node_id: String,
    pub mac: Mac,
    pub state: Arc<Mutex<AgentState>>,
    pub paused: Arc<AtomicBool>,
    pub inbound: SyncSender<Message>,
    pub join: std::thread::JoinHandle<()>,
}

pub struct AgentContext {
    pub record: DeviceRecord,
    pub inbound_rx: Receiver<Message>,
    pub outbound_tx: SyncSender<Message>,
    pub state: Arc<Mutex<AgentState>>,
    pub paused: Arc<AtomicBool>,
    pub running: Arc<AtomicBool>,
    pub settings: Arc<Settings>,
    pub topology: Arc<Mutex<Topology>>,
}

/// Spawn the agent's OS thread. Runs until `running` flips false, then
/// exits within one idle interval (§5 cancellation).
pub fn spawn(ctx: AgentContext) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || run(ctx))
}

fn run(ctx: AgentContext) {
    let AgentContext {
        record,
        inbound_rx,
        outbound_tx,
        state,
        paused,
        running,
        settings,
        topology,
    } = ctx;

    let mac = synth_mac(&record.key);
    let local_ips: HashSet<std::net::Ipv4Addr> =
        record.interfaces.iter().filter_map(|i| i.ip_address).collect();
    let router_id = record
        .ospf
        .router_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| record.key.clone());

    let start = Instant::now();
    let mut last_hello = Instant::now();
    let mut last_arp_sweep = Instant::now();

    info!("agent {} started (mac {})", record.key, mac_to_string(mac));

    while running.load(Ordering::Acquire) {
        if !paused.load(Ordering::Acquire) {
            while let Ok(msg) = inbound_rx.try_recv() {
                handle_message(
                    &record,
                    &mac,
                    &local_ips,
                    &router_id,
                    msg,
                    &outbound_tx,
                    &state,
                    start,
                );
            }

            if record.ospf.enabled
                && last_hello.elapsed() >= settings.hello_interval()
            {
                last_hello = Instant::now();
                flood_ospf_hello(&record, &mac, &router_id, &outbound_tx, &topology, start);
            }

            if last_arp_sweep.elapsed() >= settings.arp_sweep_interval() {
                last_arp_sweep = Instant::now();
                state.lock().evict_stale_arp(settings.arp_entry_ttl());
            }
        }

        std::thread::sleep(settings.agent_idle_interval());
    }

    info!("agent {} stopped", record.key);
}

#[allow(clippy::too_many_arguments)]
fn handle_message(
    record: &DeviceRecord,
    mac: &Mac,
    local_ips: &HashSet<std::net::Ipv4Addr>,
    router_id: &str,
    msg: Message,
    outbound_tx: &SyncSender<Message>,
    state: &Arc<Mutex<AgentState>>,
    start: Instant,
) {
    let mut st = state.lock();
    st.messages_received += 1;
    drop(st);

    match msg.kind {
        MessageKind::Arp => {
            if let Some(src_ip) = msg.src_ip {
                state.lock().arp_cache.insert(src_ip, (msg.src_mac, Instant::now()));
            }
            let is_request = msg.payload.get("request").map(|v| v == "true").unwrap_or(false);
            if is_request && msg.dst_ip.map(|ip| local_ips.contains(&ip)).unwrap_or(false) {
                let reply = Message::new(MessageKind::Arp, *mac, msg.src_mac, start.elapsed())
                    .with_payload("reply", "true");
                let _ = try_send(outbound_tx, reply, state);
            }
        }
        MessageKind::Ospf => {
            if record.kind == DeviceKind::Router {
                if let Some(sender_router_id) = msg.payload.get("router-id") {
                    state
                        .lock()
                        .ospf_neighbors
                        .insert(sender_router_id.clone(), Instant::now());
                }
            }
        }
        MessageKind::Bgp => {
            if record.kind == DeviceKind::Router {
                if let Some(peer_ip) = msg.src_ip {
                    state
                        .lock()
                        .bgp_sessions
                        .insert(peer_ip, "established".to_string());
                }
            }
        }
        MessageKind::Data => {
            let is_local = msg.dst_ip.map(|ip| local_ips.contains(&ip)).unwrap_or(false);
            if is_local {
                debug!("{}: consumed DATA message", record.key);
            } else if msg.ttl > 0 {
                let next_hop = record
                    .default_gateway
                    .as_ref()
                    .and_then(|gw| lookup_next_hop(gw, msg.dst_ip));
                debug!("{}: forwarding DATA toward {:?}", record.key, next_hop);
                let mut forwarded = msg.clone();
                forwarded.ttl -= 1;
                forwarded.src_mac = *mac;
                let _ = try_send(outbound_tx, forwarded, state);
            } else {
                state.lock().packets_dropped += 1;
            }
        }
        MessageKind::LinkFailure => {
            debug!(
                "{}: observed link failure toward {:?}",
                record.key,
                msg.payload.get("peer")
            );
        }
    }
    let _ = router_id;
}

/// Crude prefix-string match, preserved verbatim from the source per
/// §9's open question: this is not real longest-prefix match and must
/// never be advertised as correct forwarding.
fn lookup_next_hop(gateway: &str, dest_ip: Option<std::net::Ipv4Addr>) -> Option<String> {
    let dest = dest_ip?.to_string();
    let prefix_len = 7.min(gateway.len()).min(dest.len());
    if gateway[..prefix_len] == dest[..prefix_len] {
        Some(gateway.to_string())
    } else {
        None
    }
}

fn flood_ospf_hello(
    record: &DeviceRecord,
    mac: &Mac,
    router_id: &str,
    outbound_tx: &SyncSender<Message>,
    topology: &Arc<Mutex<Topology>>,
    start: Instant,
) {
    let neighbors = topology.lock().neighbor_keys(&record.key);
    for _neighbor in neighbors {
        let hello = Message::new(MessageKind::Ospf, *mac, BROADCAST_MAC, start.elapsed())
            .with_payload("hello", "true")
            .with_payload("router-id", router_id)
            .with_payload("area", "0.0.0.0");
        match outbound_tx.try_send(hello) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {}
            Err(TrySendError::Disconnected(_)) => break,
        }
    }
}

fn try_send(
    outbound_tx: &SyncSender<Message>,
    msg: Message,
    state: &Arc<Mutex<AgentState>>,
) -> Result<(), ()> {
    match outbound_tx.try_send(msg) {
        Ok(()) => {
            state.lock().messages_sent += 1;
            Ok(())
        }
        Err(TrySendError::Full(_)) => {
            state.lock().packets_dropped += 1;
            Err(())
        }
        Err(TrySendError::Disconnected(_)) => Err(()),
    }
}
