//! Configuration schema.
//!
//! `RelayConfig` is the root; each section lives in its own submodule and
//! fills in defaults for anything the file leaves out.

mod listen;
mod session;
mod shutdown;

pub use listen::*;
pub use session::*;
pub use shutdown::*;

use serde::{Deserialize, Serialize};

/// Root configuration for the relay.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub listen: ListenConfig,
    pub session: SessionConfig,
    pub shutdown: ShutdownConfig,
}
