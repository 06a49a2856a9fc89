//! Self-diagnostics through tracing
//!
//! The pipeline reports its own trouble (failed dumps, rotations, consumer
//! panics) with `tracing` events. This installs a subscriber that prints them
//! to standard error, kept apart from the log stream itself.

use anyhow::Result;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_DIAGNOSTICS_FILTER: &str = "spoollog=info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_DIAGNOSTICS_FILTER.into())
}

/// Install the global diagnostics subscriber
///
/// Fails if another global subscriber is already set.
pub fn init_diagnostics() -> Result<()> {
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(stderr_layer)
        .try_init()?;

    Ok(())
}
