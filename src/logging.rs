//! Tracing subscriber setup for binaries and tests that use the crate.
//!
//! The crate itself only emits `tracing` events; installing a subscriber
//! is the caller's choice.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable checked before `RUST_LOG`.
pub const LOG_ENV: &str = "CHAIN_PROVIDERS_LOG";

/// Pick the filter directive: `CHAIN_PROVIDERS_LOG`, then `RUST_LOG`,
/// then `default_filter`.
pub fn filter_directive(default_filter: &str) -> String {
    [LOG_ENV, "RUST_LOG"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default_filter.to_string())
}

/// Install a global fmt subscriber writing to stderr.
///
/// Returns `false` if a global subscriber was already set, so calling
/// this more than once is harmless.
pub fn init(default_filter: &str) -> bool {
    let directive = filter_directive(default_filter);
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_harmless() {
        let _ = init("chain_providers=debug");
        assert!(!init("chain_providers=debug"));
    }

    #[test]
    fn test_default_directive_when_unset() {
        if std::env::var(LOG_ENV).is_err() && std::env::var("RUST_LOG").is_err() {
            assert_eq!(filter_directive("warn"), "warn");
        }
    }
}
