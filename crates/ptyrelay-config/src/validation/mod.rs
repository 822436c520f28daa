//! Configuration validation.
//!
//! Checks numeric ranges for every section and collects all problems into
//! a single `ConfigError`.

mod helpers;

#[cfg(test)]
mod tests;

use crate::schema::RelayConfig;
use ptyrelay_common::ConfigError;

use helpers::validate_range;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &RelayConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    validate_listen(&mut errors, config);
    validate_session(&mut errors, config);
    validate_shutdown(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}

fn validate_listen(errors: &mut Vec<String>, config: &RelayConfig) {
    if config.listen.host.trim().is_empty() {
        errors.push("listen.host must not be empty".into());
    }
    validate_range(errors, "listen.port", config.listen.port.into(), 1, 65535);
    validate_range(errors, "listen.backlog", config.listen.backlog.into(), 1, 1024);
}

fn validate_session(errors: &mut Vec<String>, config: &RelayConfig) {
    if config.session.program.trim().is_empty() {
        errors.push("session.program must not be empty".into());
    }
    validate_range(errors, "session.rows", config.session.rows.into(), 1, u16::MAX.into());
    validate_range(errors, "session.cols", config.session.cols.into(), 1, u16::MAX.into());
    validate_range(
        errors,
        "session.chunk_size",
        config.session.chunk_size as u64,
        512,
        1024 * 1024,
    );
}

fn validate_shutdown(errors: &mut Vec<String>, config: &RelayConfig) {
    let shutdown = &config.shutdown;
    validate_range(errors, "shutdown.poll_interval_ms", shutdown.poll_interval_ms, 10, 60_000);
    validate_range(errors, "shutdown.interrupt_grace_ms", shutdown.interrupt_grace_ms, 0, 600_000);
    validate_range(errors, "shutdown.terminate_grace_ms", shutdown.terminate_grace_ms, 0, 600_000);
    validate_range(errors, "shutdown.kill_grace_ms", shutdown.kill_grace_ms, 0, 600_000);
}
