pub mod errors;
pub mod types;

pub use errors::{ConfigError, RelayError};
pub use types::{BridgeState, TermSize};
