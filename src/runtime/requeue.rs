//! # Requeue Policy
//!
//! Turns the result of an orchestrator pass into a controller [`Action`].
//!
//! - Done: resync on the regular interval and forget any backoff
//! - In progress: poll again after the async poll interval
//! - Retryable: honor the remote `Retry-After`, otherwise Fibonacci backoff per object
//! - Terminal: wait for the object to change

use kube_runtime::controller::Action;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::ReconcilerConfig;
use crate::engine::{ErrorKind, Progress};
use crate::observability::metrics;
use crate::orchestrator::OrchestratorError;

use super::backoff::FibonacciBackoff;

/// Per-object retry state
#[derive(Debug, Clone)]
pub struct BackoffState {
    pub backoff: FibonacciBackoff,
    pub error_count: u32,
}

impl BackoffState {
    #[must_use]
    pub fn new(min_seconds: u64, max_seconds: u64) -> Self {
        Self {
            backoff: FibonacciBackoff::new(min_seconds, max_seconds),
            error_count: 0,
        }
    }

    pub fn increment_error(&mut self) {
        self.error_count = self.error_count.saturating_add(1);
    }
}

#[derive(Debug)]
pub struct RequeuePolicy {
    resync_interval: Duration,
    async_poll_interval: Duration,
    backoff_min_secs: u64,
    backoff_max_secs: u64,
    backoff_states: Mutex<HashMap<String, BackoffState>>,
}

impl RequeuePolicy {
    #[must_use]
    pub fn new(config: &ReconcilerConfig) -> Self {
        Self {
            resync_interval: config.resync_interval(),
            async_poll_interval: config.async_poll_requeue(),
            backoff_min_secs: config.backoff_min_secs,
            backoff_max_secs: config.backoff_max_secs,
            backoff_states: Mutex::new(HashMap::new()),
        }
    }

    /// Key for per-object backoff state
    #[must_use]
    pub fn object_key(namespace: Option<&str>, name: &str) -> String {
        format!("{}/{}", namespace.unwrap_or("default"), name)
    }

    /// Decide when `key` should be reconciled next
    pub fn action(&self, key: &str, result: &Result<Progress, OrchestratorError>) -> Action {
        match result {
            Ok(Progress::Done) => {
                self.reset(key);
                metrics::increment_requeues_total("resync");
                Action::requeue(self.resync_interval)
            }
            Ok(Progress::Pending(token)) => {
                info!(
                    object = key,
                    kind = %token.kind,
                    resource.name = %token.resource_name,
                    "Operation in progress, polling again in {}s",
                    self.async_poll_interval.as_secs()
                );
                metrics::increment_requeues_total("async-poll");
                Action::requeue(self.async_poll_interval)
            }
            Err(err) => match err.kind() {
                ErrorKind::Retryable => {
                    let (delay, error_count) = self.next_backoff(key);
                    let delay = err.retry_after().unwrap_or(delay);
                    warn!(
                        object = key,
                        service = err.service(),
                        "Retrying in {}s (error count: {}): {}",
                        delay.as_secs(),
                        error_count,
                        err
                    );
                    metrics::increment_requeues_total("error-backoff");
                    Action::requeue(delay)
                }
                ErrorKind::Terminal => {
                    error!(
                        object = key,
                        service = err.service(),
                        "Terminal failure, waiting for a change: {}",
                        err
                    );
                    Action::await_change()
                }
            },
        }
    }

    /// Forget backoff state, e.g. after success or when the object is gone
    pub fn reset(&self, key: &str) {
        self.states().remove(key);
    }

    /// Consecutive retryable failures recorded for `key`
    #[must_use]
    pub fn error_count(&self, key: &str) -> u32 {
        self.states().get(key).map_or(0, |state| state.error_count)
    }

    fn next_backoff(&self, key: &str) -> (Duration, u32) {
        let mut states = self.states();
        let state = states
            .entry(key.to_string())
            .or_insert_with(|| BackoffState::new(self.backoff_min_secs, self.backoff_max_secs));
        state.increment_error();
        (state.backoff.next_backoff(), state.error_count)
    }

    fn states(&self) -> std::sync::MutexGuard<'_, HashMap<String, BackoffState>> {
        self.backoff_states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
