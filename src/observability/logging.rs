//! # Logging
//!
//! Tracing subscriber setup for processes embedding the reconciler.

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

use crate::config::ReconcilerConfig;

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence; otherwise the crate logs at `config.log_level`.
pub fn init_tracing(config: &ReconcilerConfig) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directive(&config.log_level).into()),
        )
        .try_init()
        .map_err(|e| anyhow!("Failed to install tracing subscriber: {e}"))
}

fn default_directive(level: &str) -> String {
    format!("resource_reconciler={}", level.to_lowercase())
}
