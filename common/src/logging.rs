//! Tracing setup.
//!
//! Library crates only emit `tracing` events; the host process decides where
//! they go. `init_tracing` and `init_tracing_from` are the default wiring for
//! hosts and tests.

use crate::SmsDbConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Installs a fmt subscriber filtered by `RUST_LOG`, or by `default_filter`
/// when the variable is unset or invalid.
///
/// Returns `false` if a global subscriber was already installed; calling it
/// more than once is harmless.
pub fn init_tracing(default_filter: &str) -> bool {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}

/// [`init_tracing`] with the store's configured `log_filter` as fallback.
pub fn init_tracing_from(config: &SmsDbConfig) -> bool {
    init_tracing(&config.log_filter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_tracing("debug");
        assert!(!init_tracing("debug"));
        assert!(!init_tracing_from(&SmsDbConfig::default()));
    }
}
