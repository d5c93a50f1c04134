//! Tracing subscriber setup for the binary.
//!
//! Level resolution: `RUST_LOG`, then `[logging] level`, then `warn`.
//! Logs go to stderr so stdout stays clean for command output.

use crate::ports::config_port::ConfigPort;
use std::env;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_LEVEL: &str = "warn";

fn resolve_directive(env_value: Option<String>, config_level: Option<String>) -> String {
    env_value
        .filter(|v| !v.trim().is_empty())
        .or(config_level)
        .unwrap_or_else(|| DEFAULT_LEVEL.to_string())
}

pub fn build_filter(config: &dyn ConfigPort) -> EnvFilter {
    let directive = resolve_directive(
        env::var(EnvFilter::DEFAULT_ENV).ok(),
        config.get_string("logging", "level"),
    );
    EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL))
}

/// Install the global subscriber. A second call is a no-op.
pub fn init(config: &dyn ConfigPort) {
    let ansi = config.get_bool("logging", "ansi", false);
    let _ = tracing_subscriber::fmt()
        .with_env_filter(build_filter(config))
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(ansi)
        .try_init();
}
