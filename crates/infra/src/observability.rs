//! Tracing setup
//!
//! `RUST_LOG` wins over [`LoggingConfig::level`] when set. Payload contents
//! never reach the log; call sites record kind, dedup key and counts only.

use herdsync_domain::{HerdSyncError, LoggingConfig, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber.
///
/// # Errors
/// Returns `HerdSyncError::Config` if the configured level is not a valid
/// filter directive or a global subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = build_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if config.json {
        registry.with(fmt::layer().json().with_target(true)).try_init()
    } else {
        registry.with(fmt::layer().with_target(false)).try_init()
    };

    installed.map_err(|e| HerdSyncError::Config(format!("failed to install tracing: {e}")))
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.level)
        .map_err(|e| HerdSyncError::Config(format!("invalid log level {:?}: {e}", config.level)))
}
