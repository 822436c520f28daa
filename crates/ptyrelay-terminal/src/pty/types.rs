//! PTY and signal error types.

use std::fmt;

/// Errors originating from PTY operations.
#[derive(Debug, thiserror::Error)]
pub enum PtyError {
    #[error("failed to open pty: {0}")]
    OpenFailed(String),

    #[error("failed to spawn process: {0}")]
    SpawnFailed(String),

    #[error(transparent)]
    IoError(#[from] std::io::Error),
}

impl From<PtyError> for ptyrelay_common::RelayError {
    fn from(err: PtyError) -> Self {
        match err {
            PtyError::SpawnFailed(msg) => ptyrelay_common::RelayError::Spawn(msg),
            PtyError::OpenFailed(msg) => ptyrelay_common::RelayError::Pty(msg),
            PtyError::IoError(e) => ptyrelay_common::RelayError::Pty(e.to_string()),
        }
    }
}

/// Signals used to stop a session program, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Signal {
    Interrupt,
    Terminate,
    Kill,
}

impl Signal {
    pub fn as_raw(self) -> libc::c_int {
        match self {
            Signal::Interrupt => libc::SIGINT,
            Signal::Terminate => libc::SIGTERM,
            Signal::Kill => libc::SIGKILL,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Signal::Interrupt => "SIGINT",
            Signal::Terminate => "SIGTERM",
            Signal::Kill => "SIGKILL",
        })
    }
}

/// Failure to deliver a signal to a process group.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    #[error("no process group to signal")]
    NoProcessGroup,

    #[error("failed to send {signal} to process group {pgid}: {source}")]
    Delivery {
        signal: Signal,
        pgid: i32,
        #[source]
        source: std::io::Error,
    },
}

impl SignalError {
    /// The target no longer exists.
    pub fn is_gone(&self) -> bool {
        match self {
            SignalError::NoProcessGroup => true,
            SignalError::Delivery { source, .. } => source.raw_os_error() == Some(libc::ESRCH),
        }
    }
}
