//! Diagnostic logging to stderr.
//!
//! stdout carries JSON for callers, so logs never go there. The filter comes
//! from `TOWNWATCH_LOG` (standard `EnvFilter` syntax) and defaults to `warn`,
//! or `debug` with `--verbose`.

use std::io;

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "TOWNWATCH_LOG";

pub fn init(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}
