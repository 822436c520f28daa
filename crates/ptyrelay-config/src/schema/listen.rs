use serde::{Deserialize, Serialize};

/// TCP endpoint the relay listens on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenConfig {
    /// Bind address. `0.0.0.0` listens on all interfaces.
    pub host: String,
    pub port: u16,
    /// Pending-connection queue length passed to `listen(2)`.
    pub backlog: u32,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 9867,
            backlog: 5,
        }
    }
}

impl ListenConfig {
    /// `host:port`, bracketing IPv6 literals.
    pub fn address(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}
