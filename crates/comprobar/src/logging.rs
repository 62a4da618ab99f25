//! Tracing bootstrap for test runners.

use tracing_subscriber::filter::EnvFilter;

/// Environment variable controlling the log filter
pub const LOG_ENV_VAR: &str = "COMPROBAR_LOG";

/// Install the global fmt subscriber, filtered by `COMPROBAR_LOG`
/// (default `info`). Safe to call from every test entry point: if a
/// subscriber is already installed this is a no-op.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
