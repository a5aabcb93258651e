//! # Remote Client Adapter
//!
//! Uniform capability set over a vendor provisioning API. One implementation per
//! resource kind; the engine treats them as interchangeable strategy objects.
//!
//! Implementations must never wait for a long-running operation to finish: a
//! submission either completes synchronously or hands back an [`OperationHandle`]
//! that the engine persists and polls on later invocations.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::engine::ErrorKind;
use crate::status::OperationToken;

/// Adapter-specific state needed to poll a submitted operation
///
/// For HTTP APIs this is typically the serialized polling URL and headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationHandle(Vec<u8>);

impl OperationHandle {
    #[must_use]
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self(payload.into())
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

/// Result of submitting a create-or-update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission<T> {
    /// The remote API finished synchronously
    Completed(T),
    /// The remote API accepted a long-running operation
    Pending(OperationHandle),
}

/// Errors surfaced by an adapter
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("resource not found")]
    NotFound,
    #[error("remote API returned {status}: {message}")]
    Api {
        status: u16,
        message: String,
        retry_after: Option<Duration>,
    },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected remote object: {0}")]
    UnexpectedObject(String),
    #[error("deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),
}

impl ClientError {
    /// Build an error from an HTTP status, folding 404 into `NotFound`
    #[must_use]
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        if status == 404 {
            return ClientError::NotFound;
        }
        ClientError::Api {
            status,
            message: message.into(),
            retry_after: None,
        }
    }

    /// Attach a server-provided `Retry-After` hint
    #[must_use]
    pub fn with_retry_after(self, delay: Duration) -> Self {
        match self {
            ClientError::Api {
                status, message, ..
            } => ClientError::Api {
                status,
                message,
                retry_after: Some(delay),
            },
            other => other,
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ClientError::NotFound | ClientError::Api { status: 404, .. }
        )
    }

    /// Classify for the engine
    ///
    /// Transport failures, throttling, timeouts and 5xx are retryable. Everything
    /// else (validation, permission denial, conflicts, shape mismatches) is terminal.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Transport(_) | ClientError::DeadlineExceeded(_) => ErrorKind::Retryable,
            ClientError::Api { status, .. } if is_retryable_status(*status) => {
                ErrorKind::Retryable
            }
            ClientError::NotFound | ClientError::Api { .. } | ClientError::UnexpectedObject(_) => {
                ErrorKind::Terminal
            }
        }
    }

    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ClientError::Api { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429) || (500..600).contains(&status)
}

/// Capability set the engine needs from a resource kind's remote API
#[async_trait]
pub trait AsyncClient: Send + Sync {
    /// Observed state of the remote resource
    type Object: Clone + Send + Sync;
    /// Request body for a create-or-update
    type Parameters: Send;

    /// Fetch the current object; `Ok(None)` when it does not exist
    async fn get(&self, owner: &str, name: &str) -> Result<Option<Self::Object>, ClientError>;

    /// Submit a create-or-update without waiting for a long-running operation
    async fn create_or_update_async(
        &self,
        owner: &str,
        name: &str,
        parameters: Self::Parameters,
    ) -> Result<Submission<Self::Object>, ClientError>;

    /// Non-blocking poll of a submitted operation
    async fn is_done(&self, token: &OperationToken) -> Result<bool, ClientError>;

    /// Final result of an operation that `is_done` reported finished
    async fn result(&self, token: &OperationToken) -> Result<Option<Self::Object>, ClientError>;

    /// Submit a delete; `Ok(None)` when it finished synchronously or is a no-op
    async fn delete_async(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<Option<OperationHandle>, ClientError>;
}
