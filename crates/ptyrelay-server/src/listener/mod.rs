//! Accept loop. Connections are served strictly one at a time: the next
//! `accept` only happens after the previous session has fully closed.


use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use ptyrelay_common::RelayError;
use ptyrelay_config::ListenConfig;
use tokio::net::{TcpListener, TcpSocket};

use crate::bridge::Bridge;

/// Pause after a failed `accept` so a persistent error (e.g. EMFILE) does
/// not spin the loop.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

pub struct Listener {
    listener: TcpListener,
    bridge: Bridge,
}

impl Listener {
    /// Bind the configured address with address reuse enabled.
    pub async fn bind(config: &ListenConfig, bridge: Bridge) -> Result<Self, RelayError> {
        let address = config.address();
        let bind_error = |source: io::Error| RelayError::Bind {
            addr: address.clone(),
            source,
        };

        let addr = tokio::net::lookup_host(&address)
            .await
            .map_err(bind_error)?
            .next()
            .ok_or_else(|| {
                bind_error(io::Error::new(
                    io::ErrorKind::AddrNotAvailable,
                    "host did not resolve to any address",
                ))
            })?;

        let socket = match addr {
            SocketAddr::V4(_) => TcpSocket::new_v4(),
            SocketAddr::V6(_) => TcpSocket::new_v6(),
        }
        .map_err(bind_error)?;
        socket.set_reuseaddr(true).map_err(bind_error)?;
        socket.bind(addr).map_err(bind_error)?;
        let listener = socket.listen(config.backlog).map_err(bind_error)?;

        tracing::info!("ptyrelay listening on {}", addr);
        Ok(Self { listener, bridge })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve connections until the shutdown flag is set. An active session
    /// is drained before this returns.
    pub async fn serve(self) -> Result<(), RelayError> {
        let Listener { listener, bridge } = self;
        let shutdown = bridge.shutdown_token().clone();

        loop {
            let accepted = tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, peer)) => match bridge.run(stream, peer).await {
                    Ok(summary) => tracing::info!(
                        peer = %summary.peer,
                        reason = %summary.reason,
                        outcome = ?summary.outcome,
                        exit = ?summary.exit,
                        state = %summary.state,
                        size = %summary.size,
                        bytes_in = summary.bytes_from_peer,
                        bytes_out = summary.bytes_to_peer,
                        duration_ms = summary.duration.as_millis() as u64,
                        "session closed"
                    ),
                    Err(e) => tracing::warn!(peer = %peer, error = %e, "session aborted"),
                },
                Err(e) => {
                    tracing::warn!(error = %e, "TCP accept error");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            }
        }

        tracing::info!("server shutting down");
        drop(listener);
        Ok(())
    }
}
