//! ptyrelay configuration.
//!
//! TOML-based configuration for the listener, the session program and the
//! shutdown escalation. Every section uses defaults so partial configs work
//! out of the box.

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{ListenConfig, RelayConfig, SessionConfig, ShutdownConfig};
pub use toml_loader::{create_default_config, default_config_path, load_default, load_from_path};

use ptyrelay_common::ConfigError;
use std::path::Path;

/// Load config from an explicit path, or from the platform default path
/// when none is given.
///
/// An explicit path must exist. A missing default file yields defaults.
pub fn load_config(path: Option<&Path>) -> Result<RelayConfig, ConfigError> {
    match path {
        Some(path) => {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.to_path_buf()));
            }
            load_from_path(path)
        }
        None => load_default(),
    }
}
