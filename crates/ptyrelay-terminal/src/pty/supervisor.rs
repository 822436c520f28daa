//! Lifecycle of the program attached to a session's terminal: spawn,
//! liveness polling and the interrupt → terminate → kill escalation.

use portable_pty::{Child, SlavePty};
use std::io::Write;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{PtyError, SessionCommand, Signal, SignalError};
use crate::control::INTERRUPT;

/// Liveness of a supervised child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildState {
    Running,
    /// `None` when the exit status could not be collected.
    Exited(Option<u32>),
}

impl ChildState {
    pub fn is_running(&self) -> bool {
        matches!(self, ChildState::Running)
    }
}

/// Which step of the escalation ended the child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// The child had exited before shutdown began; nothing was sent.
    AlreadyExited,
    Interrupted,
    Terminated,
    Killed,
    /// SIGKILL was sent but the exit could not be confirmed in time.
    Unconfirmed,
}

/// Timings for [`ChildProcess::shutdown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownPolicy {
    pub poll_interval: Duration,
    pub interrupt_grace: Duration,
    pub terminate_grace: Duration,
    pub kill_grace: Duration,
}

impl Default for ShutdownPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            interrupt_grace: Duration::from_secs(5),
            terminate_grace: Duration::from_secs(2),
            kill_grace: Duration::from_secs(1),
        }
    }
}

/// A session program running on the slave side of a pseudo-terminal, as
/// leader of its own session and process group.
///
/// Dropping a record whose child is still running kills the whole group.
pub struct ChildProcess {
    child: Box<dyn Child + Send + Sync>,
    pid: Option<u32>,
    pgid: Option<i32>,
    state: ChildState,
}

impl ChildProcess {
    /// Spawn `command` with stdin, stdout and stderr on `slave`.
    ///
    /// The caller should drop its slave handle afterwards so the master sees
    /// end of output once the child exits.
    pub fn spawn(slave: &dyn SlavePty, command: &SessionCommand) -> Result<Self, PtyError> {
        let child = slave
            .spawn_command(command.to_builder())
            .map_err(|e| PtyError::SpawnFailed(format!("{}: {e}", command.program)))?;

        let pid = child.process_id();
        let pgid = pid.map(|pid| process_group_of(pid as i32));

        info!(program = %command.program, pid = ?pid, pgid = ?pgid, "session program started");

        Ok(Self {
            child,
            pid,
            pgid,
            state: ChildState::Running,
        })
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn pgid(&self) -> Option<i32> {
        self.pgid
    }

    /// Check whether the child has exited, without blocking.
    ///
    /// Once an exit is observed it is cached; later calls do not touch the
    /// process again.
    pub fn poll(&mut self) -> ChildState {
        if self.state.is_running() {
            match self.child.try_wait() {
                Ok(Some(status)) => {
                    debug!(pid = ?self.pid, code = status.exit_code(), "session program exited");
                    self.state = ChildState::Exited(Some(status.exit_code()));
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(pid = ?self.pid, error = %e, "could not collect exit status, treating as exited");
                    self.state = ChildState::Exited(None);
                }
            }
        }
        self.state
    }

    /// Deliver `signal` to the child's whole process group.
    pub fn signal_group(&self, signal: Signal) -> Result<(), SignalError> {
        let pgid = self.pgid.ok_or(SignalError::NoProcessGroup)?;
        // SAFETY: killpg has no memory-safety preconditions.
        if unsafe { libc::killpg(pgid, signal.as_raw()) } == 0 {
            Ok(())
        } else {
            Err(SignalError::Delivery {
                signal,
                pgid,
                source: std::io::Error::last_os_error(),
            })
        }
    }

    /// Stop the child with increasing force.
    ///
    /// 1. Write Ctrl+C into the terminal (`tty`) and send SIGINT to the group,
    ///    then wait up to `interrupt_grace`.
    /// 2. Send SIGTERM, then wait up to `terminate_grace`.
    /// 3. Send SIGKILL, then wait up to `kill_grace` for confirmation.
    ///
    /// Every step starts with a poll and is skipped once the child is gone.
    pub async fn shutdown(
        &mut self,
        tty: &mut (dyn Write + Send),
        policy: &ShutdownPolicy,
    ) -> ShutdownOutcome {
        if !self.poll().is_running() {
            return ShutdownOutcome::AlreadyExited;
        }

        info!(pid = ?self.pid, "sending Ctrl+C (SIGINT) to session program");
        if let Err(e) = tty.write_all(&[INTERRUPT]).and_then(|_| tty.flush()) {
            debug!(error = %e, "could not write interrupt character");
        }
        if !self.deliver(Signal::Interrupt) {
            return ShutdownOutcome::Interrupted;
        }
        if self.wait_for_exit(policy.interrupt_grace, policy.poll_interval).await {
            info!(pid = ?self.pid, "session program exited after interrupt");
            return ShutdownOutcome::Interrupted;
        }

        info!(pid = ?self.pid, "interrupt ignored, sending SIGTERM");
        if !self.deliver(Signal::Terminate) {
            return ShutdownOutcome::Terminated;
        }
        if self.wait_for_exit(policy.terminate_grace, policy.poll_interval).await {
            info!(pid = ?self.pid, "session program exited after SIGTERM");
            return ShutdownOutcome::Terminated;
        }

        warn!(pid = ?self.pid, "session program still running, sending SIGKILL");
        if !self.deliver(Signal::Kill) {
            return ShutdownOutcome::Killed;
        }
        if self.wait_for_exit(policy.kill_grace, policy.poll_interval).await {
            ShutdownOutcome::Killed
        } else {
            warn!(pid = ?self.pid, "exit not confirmed after SIGKILL");
            ShutdownOutcome::Unconfirmed
        }
    }

    /// Send `signal` to the group. Returns `false` when delivery failed,
    /// which is treated as the child already being gone.
    fn deliver(&mut self, signal: Signal) -> bool {
        match self.signal_group(signal) {
            Ok(()) => true,
            Err(e) => {
                warn!(pid = ?self.pid, error = %e, gone = e.is_gone(), "signal delivery failed");
                self.poll();
                false
            }
        }
    }

    async fn wait_for_exit(&mut self, window: Duration, interval: Duration) -> bool {
        let deadline = Instant::now() + window;
        loop {
            if !self.poll().is_running() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            tokio::time::sleep(interval.min(deadline - now)).await;
        }
    }
}

impl Drop for ChildProcess {
    fn drop(&mut self) {
        if self.poll().is_running() {
            warn!(pid = ?self.pid, "session program outlived its session, killing process group");
            match self.signal_group(Signal::Kill) {
                Ok(()) => {
                    let _ = self.child.wait();
                }
                Err(e) => debug!(error = %e, "final kill failed"),
            }
        }
    }
}

fn process_group_of(pid: i32) -> i32 {
    // SAFETY: getpgid has no memory-safety preconditions.
    let pgid = unsafe { libc::getpgid(pid) };
    // The child calls setsid() before exec, so it leads a group named
    // after its own pid.
    if pgid > 0 {
        pgid
    } else {
        pid
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pty::{open_pty, PtyMaster};
    use ptyrelay_common::TermSize;

    fn fast_policy() -> ShutdownPolicy {
        ShutdownPolicy {
            poll_interval: Duration::from_millis(20),
            interrupt_grace: Duration::from_millis(400),
            terminate_grace: Duration::from_millis(300),
            kill_grace: Duration::from_secs(2),
        }
    }

    fn spawn_sh(script: &str) -> (ChildProcess, Box<dyn Write + Send>, portable_pty::PtyPair) {
        let pair = open_pty(TermSize::default()).expect("openpty");
        let command = SessionCommand::new("/bin/sh").args(["-c", script]);
        let child = ChildProcess::spawn(&*pair.slave, &command).expect("spawn");
        let writer = pair.master.take_writer().expect("writer");
        (child, writer, pair)
    }

    /// Spawn `script` and wait until it prints `ready`. Signals delivered
    /// while the shell is still starting up can be lost.
    async fn spawn_ready(script: &str) -> (ChildProcess, PtyMaster) {
        let pair = open_pty(TermSize::default()).expect("openpty");
        let command = SessionCommand::new("/bin/sh").args(["-c", script]);
        let child = ChildProcess::spawn(&*pair.slave, &command).expect("spawn");
        drop(pair.slave);
        let mut master = PtyMaster::new(pair.master).expect("master");

        let mut output = String::new();
        let mut buf = [0u8; 1024];
        let wait = async {
            while !output.contains("ready") {
                match master.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => output.push_str(&String::from_utf8_lossy(&buf[..n])),
                }
            }
        };
        tokio::time::timeout(Duration::from_secs(5), wait)
            .await
            .expect("session program never became ready");
        assert!(output.contains("ready"), "output: {output:?}");
        (child, master)
    }

    async fn wait_exited(child: &mut ChildProcess) -> ChildState {
        for _ in 0..250 {
            let state = child.poll();
            if !state.is_running() {
                return state;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        child.poll()
    }

    #[tokio::test]
    async fn spawn_reports_pid_and_own_group() {
        let (mut child, _writer, _pair) = spawn_sh("sleep 5");
        let pid = child.pid().expect("pid") as i32;
        assert_eq!(child.pgid(), Some(pid));
        assert!(child.poll().is_running());
    }

    #[test]
    fn spawn_missing_program_fails() {
        let pair = open_pty(TermSize::default()).expect("openpty");
        let command = SessionCommand::new("/nonexistent/ptyrelay-session-program");
        let err = ChildProcess::spawn(&*pair.slave, &command).err().expect("spawn must fail");
        assert!(matches!(err, PtyError::SpawnFailed(_)));
    }

    #[tokio::test]
    async fn poll_observes_exit_code() {
        let (mut child, _writer, _pair) = spawn_sh("exit 3");
        assert_eq!(wait_exited(&mut child).await, ChildState::Exited(Some(3)));
        // Cached afterwards.
        assert_eq!(child.poll(), ChildState::Exited(Some(3)));
    }

    #[tokio::test]
    async fn shutdown_of_exited_child_sends_nothing() {
        let (mut child, mut writer, _pair) = spawn_sh("exit 0");
        assert_eq!(wait_exited(&mut child).await, ChildState::Exited(Some(0)));

        let started = Instant::now();
        let outcome = child.shutdown(&mut *writer, &fast_policy()).await;
        assert_eq!(outcome, ShutdownOutcome::AlreadyExited);
        assert!(started.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn interrupt_stops_cooperative_child() {
        let (mut child, mut master) = spawn_ready("echo ready; exec sleep 30").await;
        let outcome = child.shutdown(master.input(), &fast_policy()).await;
        assert_eq!(outcome, ShutdownOutcome::Interrupted);
        assert!(!child.poll().is_running());
    }

    #[tokio::test]
    async fn terminate_follows_ignored_interrupt() {
        let (mut child, mut master) =
            spawn_ready("trap '' INT; echo ready; while :; do sleep 0.05; done").await;

        let outcome = child.shutdown(master.input(), &fast_policy()).await;
        assert_eq!(outcome, ShutdownOutcome::Terminated);
    }

    #[tokio::test]
    async fn kill_follows_ignored_interrupt_and_terminate() {
        let (mut child, mut master) =
            spawn_ready("trap '' INT TERM; echo ready; while :; do sleep 0.05; done").await;

        let policy = fast_policy();
        let started = Instant::now();
        let outcome = child.shutdown(master.input(), &policy).await;

        assert_eq!(outcome, ShutdownOutcome::Killed);
        assert!(started.elapsed() >= policy.interrupt_grace + policy.terminate_grace);
        assert!(!child.poll().is_running());
    }

    #[tokio::test]
    async fn drop_kills_running_child() {
        let (child, _writer, _pair) = spawn_sh("trap '' INT TERM; sleep 30");
        let pid = child.pid().expect("pid") as i32;
        drop(child);

        // SAFETY: signal 0 only checks that the process exists.
        let alive = unsafe { libc::kill(pid, 0) } == 0;
        assert!(!alive, "session program {pid} survived drop");
    }
}
