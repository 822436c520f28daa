use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timings for the interrupt → terminate → kill escalation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Liveness poll interval, also the idle tick of the relay loop.
    pub poll_interval_ms: u64,
    /// How long to wait after SIGINT before escalating.
    pub interrupt_grace_ms: u64,
    /// How long to wait after SIGTERM before escalating.
    pub terminate_grace_ms: u64,
    /// How long to wait for the exit to be confirmed after SIGKILL.
    pub kill_grace_ms: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            interrupt_grace_ms: 5000,
            terminate_grace_ms: 2000,
            kill_grace_ms: 1000,
        }
    }
}

impl ShutdownConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn interrupt_grace(&self) -> Duration {
        Duration::from_millis(self.interrupt_grace_ms)
    }

    pub fn terminate_grace(&self) -> Duration {
        Duration::from_millis(self.terminate_grace_ms)
    }

    pub fn kill_grace(&self) -> Duration {
        Duration::from_millis(self.kill_grace_ms)
    }
}
