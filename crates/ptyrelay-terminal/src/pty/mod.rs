//! Pseudo-terminal management using the `portable-pty` crate.
//!
//! [`open_pty`] allocates a master/slave pair, [`ChildProcess`] supervises
//! the program attached to the slave, and [`PtyMaster`] drives the master
//! side through tokio readiness.

mod command;
mod master;
mod supervisor;
mod types;

pub use command::*;
pub use master::*;
pub use supervisor::*;
pub use types::*;

use portable_pty::{native_pty_system, PtyPair};
use ptyrelay_common::TermSize;

/// Allocate a pseudo-terminal pair with the given initial size.
pub fn open_pty(size: TermSize) -> Result<PtyPair, PtyError> {
    native_pty_system()
        .openpty(crate::size::pty_size(size))
        .map_err(|e| PtyError::OpenFailed(e.to_string()))
}
