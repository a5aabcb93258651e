//! # Reconciler Configuration
//!
//! Engine-level settings loaded from environment variables.

use std::time::Duration;

use crate::constants::{
    DEFAULT_ASYNC_POLL_REQUEUE_SECS, DEFAULT_BACKOFF_MAX_SECS, DEFAULT_BACKOFF_MIN_SECS,
    DEFAULT_RESYNC_INTERVAL_SECS, DEFAULT_SERVICE_RECONCILE_TIMEOUT_SECS,
};

/// Reconciler-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
/// In a cluster these are usually populated from a ConfigMap using `envFrom`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// Upper bound for a single service reconcile/delete invocation (seconds)
    /// Every remote call made by the engine is raced against this deadline
    pub service_reconcile_timeout_secs: u64,
    /// Requeue interval while a long-running operation is in flight (seconds)
    pub async_poll_requeue_secs: u64,
    /// Requeue interval after a successful reconciliation (seconds)
    pub resync_interval_secs: u64,
    /// Fibonacci backoff start for retryable errors (seconds)
    pub backoff_min_secs: u64,
    /// Fibonacci backoff cap for retryable errors (seconds)
    pub backoff_max_secs: u64,
    /// Global log level (ERROR, WARN, INFO, DEBUG, TRACE)
    pub log_level: String,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            service_reconcile_timeout_secs: DEFAULT_SERVICE_RECONCILE_TIMEOUT_SECS,
            async_poll_requeue_secs: DEFAULT_ASYNC_POLL_REQUEUE_SECS,
            resync_interval_secs: DEFAULT_RESYNC_INTERVAL_SECS,
            backoff_min_secs: DEFAULT_BACKOFF_MIN_SECS,
            backoff_max_secs: DEFAULT_BACKOFF_MAX_SECS,
            log_level: "INFO".to_string(),
        }
    }
}

impl ReconcilerConfig {
    /// Load configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    ///
    /// `from_env` delegates here; tests pass a map instead of mutating the process environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            service_reconcile_timeout_secs: parse_or(
                lookup("SERVICE_RECONCILE_TIMEOUT_SECS"),
                defaults.service_reconcile_timeout_secs,
            ),
            async_poll_requeue_secs: parse_or(
                lookup("ASYNC_POLL_REQUEUE_SECS"),
                defaults.async_poll_requeue_secs,
            ),
            resync_interval_secs: parse_or(
                lookup("RESYNC_INTERVAL_SECS"),
                defaults.resync_interval_secs,
            ),
            backoff_min_secs: parse_or(lookup("BACKOFF_MIN_SECS"), defaults.backoff_min_secs),
            backoff_max_secs: parse_or(lookup("BACKOFF_MAX_SECS"), defaults.backoff_max_secs),
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
        }
    }

    /// Get the per-invocation service timeout
    #[must_use]
    pub fn service_reconcile_timeout(&self) -> Duration {
        Duration::from_secs(self.service_reconcile_timeout_secs)
    }

    /// Get the requeue interval used while an operation is in flight
    #[must_use]
    pub fn async_poll_requeue(&self) -> Duration {
        Duration::from_secs(self.async_poll_requeue_secs)
    }

    /// Get the requeue interval used after a successful reconciliation
    #[must_use]
    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_interval_secs)
    }
}

/// Parse a value or fall back to the default when missing or malformed
fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}
