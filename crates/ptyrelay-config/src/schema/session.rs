//! Session program settings.

use ptyrelay_common::TermSize;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What to run for each connection and how to size its terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Program launched for every accepted connection.
    pub program: String,
    /// Extra arguments passed to the program.
    pub args: Vec<String>,
    /// Working directory. `None` means inherit from the relay.
    pub working_directory: Option<String>,
    /// Extra environment variables. `TERM` and `COLORTERM` are always set.
    pub env: HashMap<String, String>,
    /// Initial terminal rows until the peer reports its size.
    pub rows: u16,
    /// Initial terminal columns until the peer reports its size.
    pub cols: u16,
    /// Largest chunk read from either endpoint in one go.
    pub chunk_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            program: "./launch.sh".into(),
            args: Vec::new(),
            working_directory: None,
            env: HashMap::new(),
            rows: 43,
            cols: 80,
            chunk_size: 4096,
        }
    }
}

impl SessionConfig {
    pub fn size(&self) -> TermSize {
        TermSize::new(self.rows, self.cols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.program, "./launch.sh");
        assert!(config.args.is_empty());
        assert!(config.working_directory.is_none());
        assert_eq!(config.size(), TermSize::default());
        assert_eq!(config.chunk_size, 4096);
    }

    #[test]
    fn session_with_env_and_args() {
        let toml_str = r#"
program = "/bin/bash"
args = ["--norc"]
working_directory = "/srv/game"

[env]
LANG = "C.UTF-8"
"#;
        let config: SessionConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.program, "/bin/bash");
        assert_eq!(config.args, vec!["--norc"]);
        assert_eq!(config.working_directory.as_deref(), Some("/srv/game"));
        assert_eq!(config.env.get("LANG").unwrap(), "C.UTF-8");
        assert_eq!(config.rows, 43);
    }
}
