//! Logging Infrastructure
//!
//! Everything goes to stderr: stdout carries the MCP stdio transport when the
//! bridge is running, and JSON output for the CLI commands.

use tracing_subscriber::EnvFilter;

/// Initialize the global subscriber. Level comes from `RUST_LOG`, default `info`.
/// Calling it twice is harmless.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}
