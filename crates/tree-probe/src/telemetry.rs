//! Log output for test runs.
//!
//! The library only emits `tracing` events; call [`init_tracing`] from a test
//! to see them. Output goes through the test writer, so `cargo test` captures
//! it per test.

use tracing_subscriber::EnvFilter;

/// Filter directives, e.g. `tree_probe=trace`
pub const LOG_ENV_VAR: &str = "TREE_PROBE_LOG";

/// Set to `json` for one JSON object per event
pub const LOG_FORMAT_ENV_VAR: &str = "TREE_PROBE_LOG_FORMAT";

/// Install a global fmt subscriber
///
/// The filter comes from `TREE_PROBE_LOG`, then `RUST_LOG`, then
/// `default_level`. Returns `false` if a subscriber was already installed.
pub fn init_tracing(default_level: &str) -> bool {
    let env_filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let json = std::env::var(LOG_FORMAT_ENV_VAR).is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_test_writer();

    if json {
        builder.json().try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_init_is_harmless() {
        let _ = init_tracing("debug");
        assert!(!init_tracing("debug"));
        tracing::debug!("still logging");
    }
}
