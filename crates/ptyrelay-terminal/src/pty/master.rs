//! Non-blocking access to the master side of a pseudo-terminal.

use portable_pty::MasterPty;
use ptyrelay_common::TermSize;
use std::io::{self, Read, Write};
use std::os::fd::RawFd;
use tokio::io::unix::AsyncFd;

use super::PtyError;

/// The master side of a pseudo-terminal, switched to non-blocking mode and
/// registered with the tokio reactor.
///
/// Reads and writes are only issued once the descriptor reports readiness,
/// so neither ever blocks the session task. Dropping a `PtyMaster` closes
/// the descriptor.
pub struct PtyMaster {
    // Declared before `master` so the descriptor is deregistered before it
    // is closed.
    io: AsyncFd<RawFd>,
    master: Box<dyn MasterPty + Send>,
    reader: Box<dyn Read + Send>,
    writer: Box<dyn Write + Send>,
}

impl PtyMaster {
    /// Must be called from within a tokio runtime.
    pub fn new(master: Box<dyn MasterPty + Send>) -> Result<Self, PtyError> {
        let fd = master
            .as_raw_fd()
            .ok_or_else(|| PtyError::OpenFailed("pty master has no file descriptor".into()))?;

        let reader = master
            .try_clone_reader()
            .map_err(|e| PtyError::OpenFailed(e.to_string()))?;
        let writer = master
            .take_writer()
            .map_err(|e| PtyError::OpenFailed(e.to_string()))?;

        // The cloned reader and writer share the open file description, so
        // they inherit O_NONBLOCK as well.
        set_nonblocking(fd)?;

        Ok(Self {
            io: AsyncFd::new(fd)?,
            master,
            reader,
            writer,
        })
    }

    /// Wait until the child has produced output and read it into `buf`.
    ///
    /// `Ok(0)` means end of output. On Linux the master reports `EIO`
    /// instead once every slave descriptor is closed.
    pub async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let mut guard = self.io.readable().await?;
            match guard.try_io(|_| self.reader.read(buf)) {
                Ok(result) => return result,
                Err(_would_block) => continue,
            }
        }
    }

    /// Write all of `data` to the child's input, waiting for the terminal
    /// to drain between partial writes.
    pub async fn write_all(&mut self, mut data: &[u8]) -> io::Result<()> {
        while !data.is_empty() {
            let mut guard = self.io.writable().await?;
            match guard.try_io(|_| self.writer.write(data)) {
                Ok(Ok(0)) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(Ok(n)) => data = &data[n..],
                Ok(Err(e)) => return Err(e),
                Err(_would_block) => continue,
            }
        }
        Ok(())
    }

    /// Direct handle on the input side, for single-byte control writes
    /// outside the relay loop.
    pub fn input(&mut self) -> &mut (dyn Write + Send) {
        &mut *self.writer
    }

    /// Apply a new window size. See [`crate::size::apply_size`].
    pub fn resize(&self, size: TermSize) -> bool {
        crate::size::apply_size(&*self.master, size)
    }

    pub fn size(&self) -> Option<TermSize> {
        self.master
            .get_size()
            .ok()
            .map(|s| TermSize::new(s.rows, s.cols))
    }
}

fn set_nonblocking(fd: RawFd) -> io::Result<()> {
    // SAFETY: `fd` belongs to the master pty, which outlives this call.
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: as above; only the status flags are changed.
    if unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) } < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}
