//! # Types
//!
//! Outcome and error types returned by the reconciliation engine.

use std::time::Duration;
use thiserror::Error;

use crate::client::ClientError;
use crate::status::OperationToken;

/// Whether the control loop should retry a failure on its own schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Transient: network, throttling, 5xx, deadline expiry
    Retryable,
    /// Will not succeed without a change to desired state or permissions
    Terminal,
}

impl ErrorKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Retryable => "retryable",
            ErrorKind::Terminal => "terminal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified failure annotated with the resource it concerns
#[derive(Debug, Error)]
#[error("{kind} failure for {service} '{resource}': {detail}")]
pub struct ReconcileError {
    pub kind: ErrorKind,
    pub service: String,
    pub resource: String,
    pub detail: String,
    pub retry_after: Option<Duration>,
    #[source]
    pub source: Option<ClientError>,
}

impl ReconcileError {
    /// Wrap an adapter error, keeping its classification
    #[must_use]
    pub fn from_client(service: &str, resource: &str, context: &str, error: ClientError) -> Self {
        Self {
            kind: error.kind(),
            service: service.to_string(),
            resource: resource.to_string(),
            detail: format!("{context}: {error}"),
            retry_after: error.retry_after(),
            source: Some(error),
        }
    }

    #[must_use]
    pub fn terminal(service: &str, resource: &str, detail: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Terminal,
            service: service.to_string(),
            resource: resource.to_string(),
            detail: detail.into(),
            retry_after: None,
            source: None,
        }
    }

    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind == ErrorKind::Retryable
    }
}

/// Result of one engine call for one resource
#[derive(Debug)]
pub enum ReconcileOutcome<T> {
    /// Remote state matches the desired state; carries the observed object when there is one
    Completed(Option<T>),
    /// A long-running operation is still running; the caller must requeue
    InProgress(OperationToken),
    Failed(ReconcileError),
}

impl<T> ReconcileOutcome<T> {
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, ReconcileOutcome::Completed(_))
    }

    #[must_use]
    pub fn is_in_progress(&self) -> bool {
        matches!(self, ReconcileOutcome::InProgress(_))
    }

    /// Drop the object and fold into the service-level view
    pub fn into_progress(self) -> Result<Progress, ReconcileError> {
        match self {
            ReconcileOutcome::Completed(_) => Ok(Progress::Done),
            ReconcileOutcome::InProgress(token) => Ok(Progress::Pending(token)),
            ReconcileOutcome::Failed(err) => Err(err),
        }
    }
}

/// Service-level progress: either everything converged or something is in flight
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    Done,
    Pending(OperationToken),
}

impl Progress {
    #[must_use]
    pub fn is_done(&self) -> bool {
        matches!(self, Progress::Done)
    }
}
