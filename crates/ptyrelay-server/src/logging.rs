//! Log filter selection.

use tracing_subscriber::EnvFilter;

pub const DEFAULT_DIRECTIVE: &str = "ptyrelay=info";

/// `--log-level` wins, then `RUST_LOG`, then [`DEFAULT_DIRECTIVE`]. An
/// unparsable directive falls through to the next source.
pub fn filter(log_level: Option<&str>, rust_log: Option<&str>) -> EnvFilter {
    log_level
        .into_iter()
        .chain(rust_log)
        .find_map(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVE))
}

pub fn init(log_level: Option<&str>) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(filter(log_level, rust_log.as_deref()))
        .init();
}
