//! Diagnostics output.
//!
//! Progress lines, per-line parse failures and the run total are emitted as
//! `tracing` events. [`init`] installs a stderr subscriber; `RUST_LOG` takes
//! precedence over the verbosity passed in.

use anyhow::{Result, anyhow};
use tracing_subscriber::EnvFilter;

/// Level used when `RUST_LOG` is not set.
pub fn default_level(verbosity: u8, quiet: bool) -> &'static str {
    match (quiet, verbosity) {
        (true, _) => "error",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    }
}

/// Install the global subscriber.
///
/// # Errors
/// Fails if a global subscriber is already installed.
pub fn init(verbosity: u8, quiet: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(verbosity, quiet)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("install log subscriber: {e}"))
}
