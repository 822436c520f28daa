//! Per-connection relay: one pseudo-terminal, one session program, one TCP
//! peer.
//!
//! A session moves through `Initializing → Active → Draining → Closed`.
//! The active loop multiplexes PTY output, peer input, a liveness tick and
//! the shutdown flag in a single task; teardown always runs once the loop
//! ends, whatever ended it.


use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use ptyrelay_common::{BridgeState, RelayError, TermSize};
use ptyrelay_config::RelayConfig;
use ptyrelay_terminal::control::{self, SESSION_END, SESSION_START};
use ptyrelay_terminal::{
    open_pty, scan_resize, ChildProcess, ChildState, PtyMaster, SessionCommand, ShutdownOutcome,
    ShutdownPolicy,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Upper bound for sending the restore sequences to a peer that stopped
/// reading.
const RESTORE_TIMEOUT: Duration = Duration::from_secs(1);

/// Output still buffered in the PTY when the child is found dead is
/// forwarded for at most this long.
const FINAL_OUTPUT_WINDOW: Duration = Duration::from_millis(500);

/// A final read that waits longer than this means the buffer is empty.
const FINAL_READ_IDLE: Duration = Duration::from_millis(50);

/// Everything a bridge needs to run a session.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub command: SessionCommand,
    pub initial_size: TermSize,
    pub chunk_size: usize,
    /// Idle tick of the relay loop; the child's liveness is checked on
    /// every tick.
    pub tick: Duration,
    pub shutdown: ShutdownPolicy,
}

impl BridgeConfig {
    pub fn from_config(config: &RelayConfig) -> Self {
        let session = &config.session;

        let mut env: Vec<(String, String)> = session
            .env
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        env.sort();

        let command = SessionCommand {
            program: session.program.clone(),
            args: session.args.clone(),
            cwd: session.working_directory.as_ref().map(PathBuf::from),
            env,
        };

        Self {
            command,
            initial_size: session.size(),
            chunk_size: session.chunk_size.max(1),
            tick: config.shutdown.poll_interval(),
            shutdown: ShutdownPolicy {
                poll_interval: config.shutdown.poll_interval(),
                interrupt_grace: config.shutdown.interrupt_grace(),
                terminate_grace: config.shutdown.terminate_grace(),
                kill_grace: config.shutdown.kill_grace(),
            },
        }
    }
}

/// Why a session left the active state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainReason {
    /// The PTY reported end of output.
    ChildOutputClosed,
    /// The liveness tick found the child gone.
    ChildExited,
    PeerClosed,
    PeerError,
    PeerWriteFailed,
    PtyWriteFailed,
    Shutdown,
}

impl fmt::Display for DrainReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DrainReason::ChildOutputClosed => "session program closed its output",
            DrainReason::ChildExited => "session program exited",
            DrainReason::PeerClosed => "peer disconnected",
            DrainReason::PeerError => "peer read failed",
            DrainReason::PeerWriteFailed => "peer write failed",
            DrainReason::PtyWriteFailed => "pty write failed",
            DrainReason::Shutdown => "relay shutting down",
        })
    }
}

/// What happened during a finished session.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub peer: SocketAddr,
    pub state: BridgeState,
    pub size: TermSize,
    pub reason: DrainReason,
    pub outcome: ShutdownOutcome,
    pub exit: ChildState,
    pub bytes_to_peer: u64,
    pub bytes_from_peer: u64,
    pub duration: Duration,
}

/// Runs sessions. Holds the configuration and the shared shutdown flag;
/// all per-session resources live in a [`Session`] owned by `run`.
pub struct Bridge {
    config: BridgeConfig,
    shutdown: CancellationToken,
}

impl Bridge {
    pub fn new(config: BridgeConfig, shutdown: CancellationToken) -> Self {
        Self { config, shutdown }
    }

    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Relay `stream` to a freshly spawned session program until either
    /// side goes away or shutdown is requested.
    ///
    /// Fails only when the session cannot be set up; the connection is
    /// closed in that case.
    pub async fn run(&self, stream: TcpStream, peer: SocketAddr) -> Result<SessionSummary, RelayError> {
        let mut session = Session::initialize(stream, peer, &self.config)?;

        let reason = match session.greet().await {
            Ok(()) => {
                session.transition(BridgeState::Active);
                session.pump(&self.config, &self.shutdown).await
            }
            Err(e) => {
                tracing::debug!(peer = %peer, error = %e, "failed to send terminal setup");
                DrainReason::PeerWriteFailed
            }
        };

        Ok(session.teardown(reason, &self.config.shutdown).await)
    }
}

/// Resources of one accepted connection.
struct Session {
    peer: SocketAddr,
    stream: TcpStream,
    master: PtyMaster,
    child: ChildProcess,
    size: TermSize,
    state: BridgeState,
    bytes_to_peer: u64,
    bytes_from_peer: u64,
    started: Instant,
}

impl Session {
    fn initialize(stream: TcpStream, peer: SocketAddr, config: &BridgeConfig) -> Result<Self, RelayError> {
        tracing::info!(peer = %peer, "Client connected");

        let pair = open_pty(config.initial_size)?;
        let child = ChildProcess::spawn(&*pair.slave, &config.command)?;
        // The child holds its own copy of the slave.
        drop(pair.slave);
        let master = PtyMaster::new(pair.master)?;

        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(peer = %peer, error = %e, "could not disable Nagle");
        }

        Ok(Self {
            peer,
            stream,
            master,
            child,
            size: config.initial_size,
            state: BridgeState::Initializing,
            bytes_to_peer: 0,
            bytes_from_peer: 0,
            started: Instant::now(),
        })
    }

    fn transition(&mut self, next: BridgeState) {
        tracing::debug!(peer = %self.peer, from = %self.state, to = %next, "session state");
        self.state = next;
    }

    /// Put the peer's terminal into the alternate screen, cursor hidden.
    async fn greet(&mut self) -> std::io::Result<()> {
        self.stream.write_all(&control::concat(&SESSION_START)).await
    }

    async fn pump(&mut self, config: &BridgeConfig, shutdown: &CancellationToken) -> DrainReason {
        let mut pty_buf = vec![0u8; config.chunk_size];
        let mut peer_buf = vec![0u8; config.chunk_size];

        let mut tick = tokio::time::interval(config.tick);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if shutdown.is_cancelled() {
                return DrainReason::Shutdown;
            }

            tokio::select! {
                _ = shutdown.cancelled() => return DrainReason::Shutdown,

                read = self.master.read(&mut pty_buf) => match read {
                    Ok(0) => return DrainReason::ChildOutputClosed,
                    Ok(n) => {
                        if let Err(reason) = self.send_to_peer(&pty_buf[..n], shutdown).await {
                            return reason;
                        }
                    }
                    Err(e) => {
                        tracing::debug!(peer = %self.peer, error = %e, "pty read ended");
                        return DrainReason::ChildOutputClosed;
                    }
                },

                read = self.stream.read(&mut peer_buf) => match read {
                    Ok(0) => return DrainReason::PeerClosed,
                    Ok(n) => {
                        let chunk = &peer_buf[..n];
                        self.apply_resize(chunk);
                        if let Err(reason) = self.send_to_child(chunk, shutdown).await {
                            return reason;
                        }
                    }
                    Err(e) => {
                        tracing::debug!(peer = %self.peer, error = %e, "peer read failed");
                        return DrainReason::PeerError;
                    }
                },

                _ = tick.tick() => {
                    if !self.child.poll().is_running() {
                        return self.forward_final_output(&mut pty_buf, shutdown).await;
                    }
                }
            }
        }
    }

    /// The child is gone, but output it wrote before exiting may still sit
    /// in the PTY. Forward it before leaving the active state.
    async fn forward_final_output(&mut self, buf: &mut [u8], shutdown: &CancellationToken) -> DrainReason {
        let deadline = Instant::now() + FINAL_OUTPUT_WINDOW;
        while Instant::now() < deadline {
            let n = match tokio::time::timeout(FINAL_READ_IDLE, self.master.read(buf)).await {
                Ok(Ok(n)) if n > 0 => n,
                _ => break,
            };
            if let Err(reason) = self.send_to_peer(&buf[..n], shutdown).await {
                return reason;
            }
        }
        DrainReason::ChildExited
    }

    async fn send_to_peer(&mut self, data: &[u8], shutdown: &CancellationToken) -> Result<(), DrainReason> {
        tokio::select! {
            written = self.stream.write_all(data) => match written {
                Ok(()) => {
                    self.bytes_to_peer += data.len() as u64;
                    Ok(())
                }
                Err(e) => {
                    tracing::debug!(peer = %self.peer, error = %e, "peer write failed");
                    Err(DrainReason::PeerWriteFailed)
                }
            },
            _ = shutdown.cancelled() => Err(DrainReason::Shutdown),
        }
    }

    /// Forward peer input unchanged, resize sequences included.
    async fn send_to_child(&mut self, data: &[u8], shutdown: &CancellationToken) -> Result<(), DrainReason> {
        tokio::select! {
            written = self.master.write_all(data) => match written {
                Ok(()) => {
                    self.bytes_from_peer += data.len() as u64;
                    Ok(())
                }
                Err(e) => {
                    tracing::debug!(peer = %self.peer, error = %e, "pty write failed");
                    Err(DrainReason::PtyWriteFailed)
                }
            },
            _ = shutdown.cancelled() => Err(DrainReason::Shutdown),
        }
    }

    fn apply_resize(&mut self, chunk: &[u8]) {
        let Some(size) = scan_resize(chunk) else {
            return;
        };
        if self.master.resize(size) {
            tracing::info!(peer = %self.peer, %size, "terminal resized");
            self.size = size;
        }
    }

    async fn teardown(mut self, reason: DrainReason, policy: &ShutdownPolicy) -> SessionSummary {
        self.transition(BridgeState::Draining);
        tracing::info!(peer = %self.peer, %reason, "Client disconnected");

        let restore = control::concat(&SESSION_END);
        match tokio::time::timeout(RESTORE_TIMEOUT, self.stream.write_all(&restore)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::debug!(peer = %self.peer, error = %e, "could not restore peer terminal"),
            Err(_) => tracing::debug!(peer = %self.peer, "timed out restoring peer terminal"),
        }

        let outcome = self.child.shutdown(self.master.input(), policy).await;
        let exit = self.child.poll();
        if let Err(e) = self.stream.shutdown().await {
            tracing::debug!(peer = %self.peer, error = %e, "connection shutdown failed");
        }

        let Session {
            peer,
            stream,
            master,
            child,
            size,
            mut state,
            bytes_to_peer,
            bytes_from_peer,
            started,
        } = self;

        drop(master);
        drop(stream);
        drop(child);
        tracing::debug!(peer = %peer, from = %state, to = %BridgeState::Closed, "session state");
        state = BridgeState::Closed;

        SessionSummary {
            peer,
            state,
            size,
            reason,
            outcome,
            exit,
            bytes_to_peer,
            bytes_from_peer,
            duration: started.elapsed(),
        }
    }
}
