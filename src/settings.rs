//! Engine-wide tunables, loaded from an optional TOML file.
//!
//! Mirrors the `CONFIG` pattern used by the teacher's lab-setup
//! configuration, but a missing file falls back to defaults rather than
//! panicking: unlike a physical test rig, this engine has sane behavior
//! with no configuration at all.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Top-level settings for a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Day-1 stabilization window, in seconds.
    pub stabilization_window_secs: u64,
    /// Per-agent idle sleep between loop iterations, in milliseconds.
    pub agent_idle_interval_ms: u64,
    /// Interval between OSPF hello floods, in seconds.
    pub hello_interval_secs: u64,
    /// Interval between ARP table sweeps, in seconds.
    pub arp_sweep_interval_secs: u64,
    /// ARP entry time-to-live before eviction, in seconds.
    pub arp_entry_ttl_secs: u64,
    /// Capacity of each agent's inbound/outbound queues.
    pub agent_queue_capacity: usize,
    /// Capacity of each per-node delivery queue owned by the fabric.
    pub delivery_queue_capacity: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            stabilization_window_secs: 60,
            agent_idle_interval_ms: 100,
            hello_interval_secs: 10,
            arp_sweep_interval_secs: 30,
            arp_entry_ttl_secs: 300,
            agent_queue_capacity: 1000,
            delivery_queue_capacity: 10_000,
        }
    }
}

impl Settings {
    /// Load settings from a TOML file, falling back to [`Settings::default`]
    /// when the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    /// The agent idle interval as a [`Duration`].
    pub fn agent_idle_interval(&self) -> Duration {
        Duration::from_millis(self.agent_idle_interval_ms)
    }

    /// The Day-1 stabilization window as a [`Duration`].
    pub fn stabilization_window(&self) -> Duration {
        Duration::from_secs(self.stabilization_window_secs)
    }

    /// Interval between OSPF hello floods, as a [`Duration`].
    pub fn hello_interval(&self) -> Duration {
        Duration::from_secs(self.hello_interval_secs)
    }

    /// Interval between ARP table sweeps, as a [`Duration`].
    pub fn arp_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.arp_sweep_interval_secs)
    }

    /// ARP entry time-to-live before eviction, as a [`Duration`].
    pub fn arp_entry_ttl(&self) -> Duration {
        Duration::from_secs(self.arp_entry_ttl_secs)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let s = Settings::default();
        assert_eq!(s.stabilization_window_secs, 60);
        assert_eq!(s.agent_idle_interval_ms, 100);
        assert_eq!(s.agent_queue_capacity, 1000);
        assert_eq!(s.delivery_queue_capacity, 10_000);
    }

    #[test]
    fn missing_file_falls_back_to_default() {
        let s = Settings::load("/nonexistent/path/settings.toml").unwrap();
        assert_eq!(s, Settings::default());
    }
}
