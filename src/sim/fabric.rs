//! The delivery fabric: a single worker that moves messages from every
//! agent's outbound queue onto a per-node delivery queue owned by the
//! engine, then drains each delivery queue onto its node's inbound
//! queue (§4.5: an agent's inbound/outbound queues have capacity 1000;
//! the engine's per-node delivery queue has capacity 10 000).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TryRecvError, TrySendError};
use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;

use crate::settings::Settings;
use crate::topology::Topology;

use super::message::{synth_mac, Mac, Message};
use super::stats::AgentState;

pub struct FabricContext {
    pub outbound_rx: HashMap<String, Receiver<Message>>,
    pub inbound_tx: HashMap<String, SyncSender<Message>>,
    pub states: HashMap<String, Arc<Mutex<AgentState>>>,
    pub topology: Arc<Mutex<Topology>>,
    pub running: Arc<AtomicBool>,
    pub paused: Arc<AtomicBool>,
    pub settings: Arc<Settings>,
}

pub fn spawn(ctx: FabricContext) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || run(ctx))
}

fn run(ctx: FabricContext) {
    let FabricContext {
        outbound_rx,
        inbound_tx,
        states,
        topology,
        running,
        paused,
        settings,
    } = ctx;

    // One bounded delivery queue per node, owned by the fabric (not the
    // agent) — the fan-out target from every sender's outbound queue,
    // drained into the node's own inbound queue below.
    let mut delivery_tx = HashMap::new();
    let mut delivery_rx = HashMap::new();
    for key in inbound_tx.keys() {
        let (tx, rx) = sync_channel::<Message>(settings.delivery_queue_capacity);
        delivery_tx.insert(key.clone(), tx);
        delivery_rx.insert(key.clone(), rx);
    }

    let mac_to_key: HashMap<Mac, String> = states
        .keys()
        .map(|key| (synth_mac(key), key.clone()))
        .collect();

    while running.load(Ordering::Acquire) {
        if !paused.load(Ordering::Acquire) {
            for (sender_key, rx) in &outbound_rx {
                loop {
                    match rx.try_recv() {
                        Ok(msg) => fan_out(sender_key, msg, &delivery_tx, &states, &topology),
                        Err(TryRecvError::Empty) => break,
                        Err(TryRecvError::Disconnected) => break,
                    }
                }
            }
            for (node_key, rx) in &delivery_rx {
                loop {
                    match rx.try_recv() {
                        Ok(msg) => drain_to_inbound(node_key, msg, &inbound_tx, &states, &mac_to_key),
                        Err(TryRecvError::Empty) => break,
                        Err(TryRecvError::Disconnected) => break,
                    }
                }
            }
        }
        std::thread::sleep(settings.agent_idle_interval());
    }
}

/// Fan a sender's outbound message out to every current graph-neighbor's
/// delivery queue. A full delivery queue counts against the sender,
/// same as a full inbound queue would under the single-hop model.
fn fan_out(
    sender_key: &str,
    msg: Message,
    delivery_tx: &HashMap<String, SyncSender<Message>>,
    states: &HashMap<String, Arc<Mutex<AgentState>>>,
    topology: &Arc<Mutex<Topology>>,
) {
    let neighbors = topology.lock().neighbor_keys(sender_key);
    for neighbor in neighbors {
        let Some(tx) = delivery_tx.get(&neighbor) else {
            continue;
        };
        match tx.try_send(msg.clone()) {
            Ok(()) => {
                debug!("queued {:?} {sender_key} -> {neighbor}", msg.kind);
            }
            Err(TrySendError::Full(_)) => {
                if let Some(state) = states.get(sender_key) {
                    state.lock().packets_dropped += 1;
                }
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

/// Drain one node's delivery queue onto its inbound queue. A full
/// inbound queue counts against the original sender, recovered from the
/// message's source MAC.
fn drain_to_inbound(
    node_key: &str,
    msg: Message,
    inbound_tx: &HashMap<String, SyncSender<Message>>,
    states: &HashMap<String, Arc<Mutex<AgentState>>>,
    mac_to_key: &HashMap<Mac, String>,
) {
    let Some(tx) = inbound_tx.get(node_key) else {
        return;
    };
    let sender_key = mac_to_key.get(&msg.src_mac);
    match tx.try_send(msg) {
        Ok(()) => {
            debug!("delivered to {node_key}");
        }
        Err(TrySendError::Full(_)) => {
            if let Some(state) = sender_key.and_then(|key| states.get(key)) {
                state.lock().packets_dropped += 1;
            }
        }
        Err(TrySendError::Disconnected(_)) => {}
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::mpsc::sync_channel;
    use std::time::Duration as StdDuration;

    use crate::config::parse;
    use crate::sim::message::synth_mac;
    use crate::sim::stats::AgentState;
    use crate::topology::build;

    #[test]
    fn messages_arrive_in_send_order() {
        let a = parse("a", "hostname A\ninterface Gi0/0\n ip address 10.0.0.1 255.255.255.252\n");
        let b = parse("b", "hostname B\ninterface Gi0/0\n ip address 10.0.0.2 255.255.255.252\n");
        let records = vec![a, b];
        let topo = build(&records);

        let (out_tx, out_rx) = sync_channel(100);
        let (in_tx, in_rx) = sync_channel(100);

        let mut outbound_rx = HashMap::new();
        outbound_rx.insert("a".to_string(), out_rx);
        let mut inbound_tx = HashMap::new();
        inbound_tx.insert("b".to_string(), in_tx);
        let mut states = HashMap::new();
        states.insert("a".to_string(), Arc::new(Mutex::new(AgentState::new("a".to_string()))));

        let running = Arc::new(AtomicBool::new(true));
        let paused = Arc::new(AtomicBool::new(false));
        let mut settings = crate::settings::Settings::default();
        settings.agent_idle_interval_ms = 5;

        let ctx = FabricContext {
            outbound_rx,
            inbound_tx,
            states,
            topology: Arc::new(Mutex::new(topo)),
            running: running.clone(),
            paused,
            settings: Arc::new(settings),
        };
        let handle = spawn(ctx);

        for seq in 0..5u32 {
            let msg = Message::new(
                super::message::MessageKind::Data,
                synth_mac("a"),
                synth_mac("b"),
                StdDuration::ZERO,
            )
            .with_payload("seq", seq.to_string());
            out_tx.send(msg).unwrap();
        }

        let mut received = Vec::new();
        for _ in 0..5 {
            let msg = in_rx.recv_timeout(StdDuration::from_secs(2)).unwrap();
            received.push(msg.payload.get("seq").cloned().unwrap());
        }
        assert_eq!(received, vec!["0", "1", "2", "3", "4"]);

        running.store(false, Ordering::Release);
        handle.join().unwrap();
    }
}
