//! Control plane (§4.5, §6): a TCP listener on loopback, one handler
//! thread per accepted connection, serving `get_statistics`,
//! `pause_node`, and `resume_node` over a JSON request/response
//! protocol.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{info, warn};
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::error::{NetlabError, Result};

use super::stats::AgentState;

/// What the control plane needs per agent: enough to pause/resume it and
/// to read out a statistics snapshot. Deliberately not the full
/// [`super::agent::AgentHandle`] — the listener never touches an
/// agent's queues directly.
#[derive(Clone)]
pub struct AgentRef {
    pub paused: Arc<AtomicBool>,
    pub state: Arc<Mutex<AgentState>>,
}

pub type AgentRegistry = Arc<HashMap<String, AgentRef>>;

/// Bind the control-plane listener and spawn its accept loop. Returns
/// the bound port, matching the startup log line in §6
/// (`IPC server listening on port <N>`).
pub fn spawn(
    agents: AgentRegistry,
    running: Arc<AtomicBool>,
) -> Result<(u16, std::thread::JoinHandle<()>)> {
    let listener = TcpListener::bind("127.0.0.1:0").map_err(NetlabError::ControlPlaneBind)?;
    listener
        .set_nonblocking(true)
        .map_err(NetlabError::ControlPlaneBind)?;
    let port = listener.local_addr().map_err(NetlabError::Io)?.port();
    info!("IPC server listening on port {port}");

    let join = std::thread::spawn(move || accept_loop(listener, agents, running));
    Ok((port, join))
}

fn accept_loop(listener: TcpListener, agents: AgentRegistry, running: Arc<AtomicBool>) {
    while running.load(Ordering::Acquire) {
        match listener.accept() {
            Ok((stream, _addr)) => {
                let agents = agents.clone();
                std::thread::spawn(move || handle_connection(stream, agents));
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(std::time::Duration::from_millis(50));
            }
            Err(e) => {
                warn!("control-plane accept error: {e}");
                std::thread::sleep(std::time::Duration::from_millis(50));
            }
        }
    }
}

fn handle_connection(mut stream: TcpStream, agents: AgentRegistry) {
    let mut buf = [0u8; 1024];
    loop {
        let n = match stream.read(&mut buf) {
            Ok(0) => return,
            Ok(n) => n,
            Err(_) => return,
        };

        let response = match serde_json::from_slice::<Value>(&buf[..n]) {
            Ok(request) => handle_request(&agents, &request),
            Err(_) => json!({"error": "Invalid JSON"}),
        };

        let Ok(mut bytes) = serde_json::to_vec(&response) else {
            return;
        };
        bytes.push(b'\n');
        if stream.write_all(&bytes).is_err() {
            return;
        }
    }
}

fn handle_request(agents: &AgentRegistry, request: &Value) -> Value {
    match request.get("type").and_then(Value::as_str) {
        Some("get_statistics") => {
            let statistics: HashMap<String, _> = agents
                .iter()
                .map(|(node_id, agent_ref)| {
                    let paused = agent_ref.paused.load(Ordering::Acquire);
                    (node_id.clone(), agent_ref.state.lock().snapshot(paused))
                })
                .collect();
            json!({"statistics": statistics})
        }
        Some("pause_node") => match request.get("node_id").and_then(Value::as_str) {
            Some(node_id) => match agents.get(node_id) {
                Some(agent_ref) => {
                    agent_ref.paused.store(true, Ordering::Release);
                    json!({"result": "paused"})
                }
                None => json!({"error": "Unknown node"}),
            },
            None => json!({"error": "Missing node_id"}),
        },
        Some("resume_node") => match request.get("node_id").and_then(Value::as_str) {
            Some(node_id) => match agents.get(node_id) {
                Some(agent_ref) => {
                    agent_ref.paused.store(false, Ordering::Release);
                    json!({"result": "resumed"})
                }
                None => json!({"error": "Unknown node"}),
            },
            None => json!({"error": "Missing node_id"}),
        },
        _ => json!({"error": "Unknown command"}),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sim::stats::AgentState;

    fn registry_with_one(node_id: &str) -> AgentRegistry {
        let mut map = HashMap::new();
        map.insert(
            node_id.to_string(),
            AgentRef {
                paused: Arc::new(AtomicBool::new(false)),
                state: Arc::new(Mutex::new(AgentState::new(node_id.to_string()))),
            },
        );
        Arc::new(map)
    }

    #[test]
    fn unknown_type_is_an_error() {
        let agents = registry_with_one("R1");
        let resp = handle_request(&agents, &json!({"type": "not_a_command"}));
        assert_eq!(resp, json!({"error": "Unknown command"}));
    }

    #[test]
    fn pause_then_get_statistics_round_trip() {
        let agents = registry_with_one("R1");
        let resp = handle_request(&agents, &json!({"type": "pause_node", "node_id": "R1"}));
        assert_eq!(resp, json!({"result": "paused"}));

        let resp = handle_request(&agents, &json!({"type": "get_statistics"}));
        assert!(resp["statistics"].get("R1").is_some());

        let resp = handle_request(&agents, &json!({"type": "resume_node", "node_id": "R1"}));
        assert_eq!(resp, json!({"result": "resumed"}));
    }

    #[test]
    fn pause_unknown_node_is_an_error() {
        let agents = registry_with_one("R1");
        let resp = handle_request(&agents, &json!({"type": "pause_node", "node_id": "ghost"}));
        assert_eq!(resp, json!({"error": "Unknown node"}));
    }
}
