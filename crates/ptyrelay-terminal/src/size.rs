//! Applying terminal geometry to a pseudo-terminal.
//!
//! Resizing is cosmetic: failures are logged and swallowed so a bad size
//! never takes a session down.

use portable_pty::{MasterPty, PtySize};
use ptyrelay_common::TermSize;

pub fn pty_size(size: TermSize) -> PtySize {
    PtySize {
        rows: size.rows,
        cols: size.cols,
        pixel_width: 0,
        pixel_height: 0,
    }
}

/// Update the window size of `master`, which makes the kernel deliver
/// SIGWINCH to the foreground process group of the terminal.
///
/// Returns `true` if the new size was applied.
pub fn apply_size(master: &dyn MasterPty, size: TermSize) -> bool {
    if !size.is_valid() {
        tracing::debug!(%size, "ignoring zero terminal size");
        return false;
    }

    match master.resize(pty_size(size)) {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(%size, error = %e, "terminal resize failed");
            false
        }
    }
}
