//! Subscriber setup for the binary.
//!
//! The library only emits `tracing` events; installing a subscriber is left to the
//! caller so tests can scope their own.

use anyhow::{anyhow, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub fn default_filter(verbose: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    }
}

/// Install a global fmt subscriber writing timestamped, level-tagged lines to stdout.
///
/// `RUST_LOG` takes precedence over `verbose`. Fails if a global subscriber is
/// already set.
pub fn init_tracing(verbose: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(verbose));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init()
        .map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))
}
