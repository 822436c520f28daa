//! Tests for the full validation pipeline.

use super::*;
use crate::schema::*;

#[test]
fn default_config_validates() {
    let config = RelayConfig::default();
    assert!(validate(&config).is_ok());
}

#[test]
fn catches_port_zero() {
    let mut config = RelayConfig::default();
    config.listen.port = 0;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("listen.port"));
}

#[test]
fn catches_empty_program() {
    let mut config = RelayConfig::default();
    config.session.program = "  ".into();
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("session.program"));
}

#[test]
fn catches_zero_rows() {
    let mut config = RelayConfig::default();
    config.session.rows = 0;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("session.rows"));
}

#[test]
fn catches_tiny_chunk_size() {
    let mut config = RelayConfig::default();
    config.session.chunk_size = 16;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("session.chunk_size"));
}

#[test]
fn catches_poll_interval_too_small() {
    let mut config = RelayConfig::default();
    config.shutdown.poll_interval_ms = 1;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("shutdown.poll_interval_ms"));
}

#[test]
fn collects_multiple_errors() {
    let mut config = RelayConfig::default();
    config.listen.backlog = 0;
    config.session.cols = 0;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("listen.backlog"));
    assert!(err.contains("session.cols"));
    assert!(err.contains("; "));
}
