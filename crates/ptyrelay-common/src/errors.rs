use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to spawn session program: {0}")]
    Spawn(String),

    #[error("pty error: {0}")]
    Pty(String),
}

impl RelayError {
    /// Whether this error should stop the whole service rather than a
    /// single session.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RelayError::Config(_) | RelayError::Bind { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = ConfigError::FileNotFound(PathBuf::from("/tmp/missing.toml"));
        assert_eq!(err.to_string(), "config file not found: /tmp/missing.toml");

        let err = ConfigError::ParseError("unexpected token".into());
        assert_eq!(err.to_string(), "config parse error: unexpected token");

        let err = ConfigError::ValidationError("listen.port = 0 is out of range".into());
        assert_eq!(
            err.to_string(),
            "config validation error: listen.port = 0 is out of range"
        );
    }

    #[test]
    fn bind_error_names_address() {
        let err = RelayError::Bind {
            addr: "0.0.0.0:9867".into(),
            source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "address in use"),
        };
        assert_eq!(err.to_string(), "failed to bind 0.0.0.0:9867: address in use");
        assert!(err.is_fatal());
    }

    #[test]
    fn relay_error_from_config() {
        let err: RelayError = ConfigError::ParseError("bad toml".into()).into();
        assert!(matches!(err, RelayError::Config(_)));
        assert!(err.to_string().contains("bad toml"));
        assert!(err.is_fatal());
    }

    #[test]
    fn session_errors_are_not_fatal() {
        assert!(!RelayError::Spawn("no such file".into()).is_fatal());
        assert!(!RelayError::Pty("openpty failed".into()).is_fatal());
    }
}
