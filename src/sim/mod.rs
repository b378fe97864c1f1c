//! Simulation Engine (C5) — the hardest component.
//!
//! Owns one thread per agent, one delivery-fabric worker thread, and a
//! TCP control-plane listener with one handler thread per connection.
//! Concurrency primitives are deliberately `std::thread` +
//! `std::sync::mpsc::sync_channel`, the "simplest" option the design
//! notes endorse (spec §9) — no async runtime, no extra crate for
//! bounded queues.

pub mod agent;
pub mod control;
pub mod fabric;
pub mod fault;
pub mod message;
pub mod stats;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, SyncSender};
use std::sync::Arc;

use log::info;
use parking_lot::Mutex;

use crate::config::DeviceRecord;
use crate::error::Result;
use crate::settings::Settings;
use crate::topology::Topology;

use agent::{AgentContext, AgentHandle};
use control::{AgentRef, AgentRegistry};
use fault::RemovedEdges;
use message::Message;
use stats::{AgentState, AgentStatistics};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Constructed,
    Running,
    Stopped,
}

/// A constructed-but-not-yet-running simulation engine over one
/// topology. Single instance per run, per the design notes: no ambient
/// global state, explicit construction and teardown.
pub struct Engine {
    records: Vec<DeviceRecord>,
    topology: Arc<Mutex<Topology>>,
    settings: Arc<Settings>,
    running: Arc<AtomicBool>,
    engine_paused: Arc<AtomicBool>,
    agents: Mutex<HashMap<String, AgentHandle>>,
    removed_edges: RemovedEdges,
    control_port: Mutex<Option<u16>>,
    lifecycle: Mutex<Lifecycle>,
}

impl Engine {
    /// Construct the engine. No threads are spawned until [`Engine::start`].
    pub fn new(records: Vec<DeviceRecord>, topology: Topology, settings: Settings) -> Self {
        Self {
            records,
            topology: Arc::new(Mutex::new(topology)),
            settings: Arc::new(settings),
            running: Arc::new(AtomicBool::new(false)),
            engine_paused: Arc::new(AtomicBool::new(false)),
            agents: Mutex::new(HashMap::new()),
            removed_edges: Arc::new(Mutex::new(HashMap::new())),
            control_port: Mutex::new(None),
            lifecycle: Mutex::new(Lifecycle::Constructed),
        }
    }

    /// Start every agent thread, the delivery fabric, and the
    /// control-plane listener. Idempotent: a second call while already
    /// running, or any call after [`Engine::stop`], is a no-op.
    pub fn start(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock();
        if *lifecycle != Lifecycle::Constructed {
            return Ok(());
        }

        self.running.store(true, Ordering::Release);

        let mut agents = self.agents.lock();
        let mut outbound_rx = HashMap::new();
        let mut inbound_tx = HashMap::new();
        let mut states = HashMap::new();

        for record in &self.records {
            let cap = self.settings.agent_queue_capacity;
            let (in_tx, in_rx) = sync_channel::<Message>(cap);
            let (out_tx, out_rx) = sync_channel::<Message>(cap);
            let state = Arc::new(Mutex::new(AgentState::new(record.key.clone())));
            let paused = Arc::new(AtomicBool::new(false));
            let mac = message::synth_mac(&record.key);

            let ctx = AgentContext {
                record: record.clone(),
                inbound_rx: in_rx,
                outbound_tx: out_tx.clone(),
                state: state.clone(),
                paused: paused.clone(),
                running: self.running.clone(),
                settings: self.settings.clone(),
                topology: self.topology.clone(),
            };
            let join = agent::spawn(ctx);

            outbound_rx.insert(record.key.clone(), out_rx);
            inbound_tx.insert(record.key.clone(), in_tx.clone());
            states.insert(record.key.clone(), state.clone());

            agents.insert(
                record.key.clone(),
                AgentHandle {
                    node_id: record.key.clone(),
                    mac,
                    state,
                    paused,
                    inbound: in_tx,
                    join,
                },
            );
        }

        fabric::spawn(fabric::FabricContext {
            outbound_rx,
            inbound_tx: inbound_tx.clone(),
            states,
            topology: self.topology.clone(),
            running: self.running.clone(),
            paused: self.engine_paused.clone(),
            settings: self.settings.clone(),
        });

        let registry: AgentRegistry = Arc::new(
            agents
                .iter()
                .map(|(k, h)| {
                    (
                        k.clone(),
                        AgentRef {
                            paused: h.paused.clone(),
                            state: h.state.clone(),
                        },
                    )
                })
                .collect(),
        );
        let (port, _control_join) = control::spawn(registry, self.running.clone())?;
        *self.control_port.lock() = Some(port);

        *lifecycle = Lifecycle::Running;
        info!("simulation engine started with {} agents", self.records.len());
        Ok(())
    }

    /// Pause every agent and halt the delivery worker. Idempotent.
    pub fn pause(&self) {
        self.engine_paused.store(true, Ordering::Release);
        for agent in self.agents.lock().values() {
            agent.paused.store(true, Ordering::Release);
        }
    }

    /// Resume every agent and the delivery worker. Idempotent.
    pub fn resume(&self) {
        self.engine_paused.store(false, Ordering::Release);
        for agent in self.agents.lock().values() {
            agent.paused.store(false, Ordering::Release);
        }
    }

    /// Flip the running flag false and close the control-plane listener.
    /// Drains nothing: in-flight messages are discarded. Idempotent.
    pub fn stop(&self) {
        let mut lifecycle = self.lifecycle.lock();
        if *lifecycle == Lifecycle::Stopped {
            return;
        }
        self.running.store(false, Ordering::Release);
        *lifecycle = Lifecycle::Stopped;
        info!("simulation engine stopped");
    }

    pub fn is_running(&self) -> bool {
        *self.lifecycle.lock() == Lifecycle::Running && self.running.load(Ordering::Acquire)
    }

    pub fn control_plane_port(&self) -> Option<u16> {
        *self.control_port.lock()
    }

    pub fn topology(&self) -> Arc<Mutex<Topology>> {
        self.topology.clone()
    }

    pub fn settings(&self) -> Arc<Settings> {
        self.settings.clone()
    }

    pub fn records(&self) -> &[DeviceRecord] {
        &self.records
    }

    pub fn node_ids(&self) -> Vec<String> {
        self.agents.lock().keys().cloned().collect()
    }

    /// Snapshot of one agent's statistics, never a live reference (§5).
    pub fn statistics(&self, node_id: &str) -> Option<AgentStatistics> {
        let agents = self.agents.lock();
        let agent = agents.get(node_id)?;
        let paused = agent.paused.load(Ordering::Acquire);
        Some(agent.state.lock().snapshot(paused))
    }

    pub fn all_statistics(&self) -> HashMap<String, AgentStatistics> {
        self.agents
            .lock()
            .iter()
            .map(|(k, h)| {
                let paused = h.paused.load(Ordering::Acquire);
                (k.clone(), h.state.lock().snapshot(paused))
            })
            .collect()
    }

    /// Enqueue a message directly onto a node's inbound queue; used by
    /// scenario drivers to synthesize ARP/OSPF/BGP state during Day-1.
    pub fn inbound_sender(&self, node_id: &str) -> Option<SyncSender<Message>> {
        self.agents.lock().get(node_id).map(|h| h.inbound.clone())
    }

    pub fn inject_link_failure(&self, a: &str, b: &str) {
        let inbound_tx: HashMap<String, SyncSender<Message>> = self
            .agents
            .lock()
            .iter()
            .map(|(k, h)| (k.clone(), h.inbound.clone()))
            .collect();
        fault::inject_link_failure(&self.topology, &self.removed_edges, &inbound_tx, a, b);
    }

    pub fn restore_link(&self, a: &str, b: &str) {
        fault::restore_link(&self.topology, &self.removed_edges, a, b);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::parse;
    use crate::topology::build;

    fn line_topology() -> (Vec<DeviceRecord>, Topology) {
        let a = parse(
            "a",
            "hostname A\ninterface Gi0/0\n ip address 10.0.0.1 255.255.255.252\n",
        );
        let b = parse(
            "b",
            "hostname B\ninterface Gi0/0\n ip address 10.0.0.2 255.255.255.252\ninterface Gi0/1\n ip address 10.0.1.1 255.255.255.252\n",
        );
        let c = parse(
            "c",
            "hostname C\ninterface Gi0/0\n ip address 10.0.1.2 255.255.255.252\n",
        );
        let records = vec![a, b, c];
        let topo = build(&records);
        (records, topo)
    }

    #[test]
    fn idempotent_lifecycle() {
        let (records, topo) = line_topology();
        let engine = Engine::new(records, topo, Settings::default());
        engine.start().unwrap();
        engine.start().unwrap();
        assert!(engine.is_running());
        engine.pause();
        engine.pause();
        engine.resume();
        engine.stop();
        engine.stop();
        assert!(!engine.is_running());
        // start-after-stop is a no-op
        engine.start().unwrap();
        assert!(!engine.is_running());
    }

    #[test]
    fn fault_injection_removes_and_restores_edge() {
        let (records, topo) = line_topology();
        let engine = Engine::new(records, topo, Settings::default());
        engine.start().unwrap();
        assert!(engine.topology().lock().has_edge("a", "b"));
        engine.inject_link_failure("a", "b");
        assert!(!engine.topology().lock().has_edge("a", "b"));
        engine.restore_link("a", "b");
        assert!(engine.topology().lock().has_edge("a", "b"));
        engine.stop();
    }
}
