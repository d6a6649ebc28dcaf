//! Logging setup for binaries and tests
//!
//! Library code only emits `tracing` events; installing a subscriber is left
//! to the process. `RUST_LOG` wins over the default filter.

use tracing_subscriber::EnvFilter;

/// Install a formatted subscriber filtered by `RUST_LOG` or `default_filter`
///
/// Returns an error if a global subscriber is already set, so tests may call
/// it repeatedly and ignore the result.
pub fn init_tracing(default_filter: &str) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))
}
