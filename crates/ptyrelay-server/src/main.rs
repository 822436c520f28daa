//! ptyrelay: serve an interactive terminal program over a raw TCP
//! connection.
//!
//! Each accepted client gets a fresh pseudo-terminal running the configured
//! program. Bytes are relayed verbatim in both directions; the only thing
//! the relay interprets is the `ESC [ 8 ; rows ; cols t` resize request.

mod bridge;
mod cli;
mod listener;
mod logging;
mod shutdown;

use std::process::ExitCode;

use ptyrelay_common::RelayError;
use tokio_util::sync::CancellationToken;

use crate::bridge::{Bridge, BridgeConfig};
use crate::listener::Listener;

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::parse();

    logging::init(args.log_level.as_deref());

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, fatal = e.is_fatal(), "ptyrelay stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: cli::Args) -> Result<(), RelayError> {
    if args.init_config {
        let path = match &args.config {
            Some(path) => path.clone(),
            None => ptyrelay_config::default_config_path()?,
        };
        ptyrelay_config::create_default_config(&path)?;
        println!("Wrote default config to {}", path.display());
        return Ok(());
    }

    let mut config = ptyrelay_config::load_config(args.config.as_deref())?;
    args.apply(&mut config);
    tracing::info!(
        program = %config.session.program,
        size = %config.session.size(),
        "session program configured"
    );

    let shutdown = CancellationToken::new();
    let signals = shutdown::spawn_signal_bridge(shutdown.clone());

    let bridge = Bridge::new(BridgeConfig::from_config(&config), shutdown.clone());
    let result = match Listener::bind(&config.listen, bridge).await {
        Ok(listener) => listener.serve().await,
        Err(e) => Err(e),
    };

    // Stops the signal bridge if serving ended on its own.
    shutdown.cancel();
    let _ = signals.await;
    result
}
