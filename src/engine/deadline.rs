//! # Deadline
//!
//! Per-invocation time budget. Each remote call is raced against the same
//! deadline so a slow API cannot stall the control loop's worker.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

use crate::client::ClientError;

#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
    budget: Duration,
}

impl Deadline {
    /// Deadline `budget` from now
    #[must_use]
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now() + budget,
            budget,
        }
    }

    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.at
    }

    /// Run a remote call, failing with `DeadlineExceeded` if the budget runs out
    ///
    /// The call's future is dropped on expiry; anything it would have returned is lost.
    pub async fn run<T, F>(&self, call: F) -> Result<T, ClientError>
    where
        F: Future<Output = Result<T, ClientError>>,
    {
        match tokio::time::timeout_at(self.at, call).await {
            Ok(result) => result,
            Err(_elapsed) => Err(ClientError::DeadlineExceeded(self.budget)),
        }
    }
}
