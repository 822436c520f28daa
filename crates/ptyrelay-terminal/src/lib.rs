pub mod control;
pub mod escape;
pub mod pty;
pub mod size;

pub use escape::{scan_resize, ResizeParseError};
pub use pty::{
    open_pty, ChildProcess, ChildState, PtyError, PtyMaster, SessionCommand, ShutdownOutcome,
    ShutdownPolicy, Signal, SignalError,
};
pub use size::{apply_size, pty_size};
