//! # Constants
//!
//! Shared constants used throughout the reconciler.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Default upper bound for one service reconcile or delete invocation (seconds)
pub const DEFAULT_SERVICE_RECONCILE_TIMEOUT_SECS: u64 = 180;

/// Default requeue interval while a long-running operation is still in flight (seconds)
pub const DEFAULT_ASYNC_POLL_REQUEUE_SECS: u64 = 15;

/// Default requeue interval after a fully successful reconciliation (seconds)
pub const DEFAULT_RESYNC_INTERVAL_SECS: u64 = 600;

/// Default Fibonacci backoff starting value for retryable errors (seconds)
pub const DEFAULT_BACKOFF_MIN_SECS: u64 = 5;

/// Default Fibonacci backoff maximum value for retryable errors (seconds)
pub const DEFAULT_BACKOFF_MAX_SECS: u64 = 300;

/// Field manager used for status patches
pub const FIELD_MANAGER: &str = "resource-reconciler";

/// Key under `.status` holding the persisted long-running operation state
pub const ASYNC_STATUS_FIELD: &str = "asyncOperations";

/// Suffix appended to a service name to form its condition type
pub const CONDITION_TYPE_SUFFIX: &str = "Ready";
