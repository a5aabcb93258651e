//! # Status
//!
//! Cross-invocation state shared between the engine and the caller's object store.
//!
//! - `token.rs` - `OperationToken`, the persisted continuation for an LRO
//! - `persistence.rs` - Persisting `AsyncStatus` in a Kubernetes status subresource
//!
//! The engine only talks to the [`AsyncStatusUpdater`] trait. [`SharedStatus`] is
//! the in-memory implementation a caller seeds from its stored object at the start
//! of an invocation and persists (see [`persistence::patch_async_status`]) at the end.

pub mod persistence;
mod token;

pub use token::{OperationToken, OperationType};

use chrono::Utc;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};

use crate::constants::CONDITION_TYPE_SUFFIX;

/// Access to the caller-owned status store
///
/// Writes take effect for the next invocation only once the caller persists the
/// surrounding object.
pub trait AsyncStatusUpdater: Send + Sync {
    /// Get the outstanding operation for `(kind, resource_name)`, if any
    fn get_async_status(&self, kind: &str, resource_name: &str) -> Option<OperationToken>;

    /// Record (`Some`) or clear (`None`) the outstanding operation for `(kind, resource_name)`
    fn update_async_status(&self, kind: &str, resource_name: &str, token: Option<OperationToken>);

    /// Record the latest state of a whole service
    fn update_service_condition(&self, service: &str, condition: ServiceCondition);
}

/// Why a service condition has its current value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ConditionReason {
    Succeeded,
    Creating,
    Deleting,
    Deleted,
    Failed,
}

/// Condition update produced by the orchestrator for one service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceCondition {
    pub ready: bool,
    pub reason: ConditionReason,
    pub message: Option<String>,
}

impl ServiceCondition {
    #[must_use]
    pub fn ready(reason: ConditionReason) -> Self {
        Self {
            ready: true,
            reason,
            message: None,
        }
    }

    #[must_use]
    pub fn not_ready(reason: ConditionReason, message: impl Into<String>) -> Self {
        Self {
            ready: false,
            reason,
            message: Some(message.into()),
        }
    }
}

/// Kubernetes-style condition as stored in status
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub r#type: String,
    pub status: String,
    #[serde(default)]
    pub last_transition_time: Option<String>,
    #[serde(default)]
    pub reason: Option<ConditionReason>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Serializable long-running operation state for one top-level object
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AsyncStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub long_running_operation_states: Vec<OperationToken>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

impl AsyncStatus {
    #[must_use]
    pub fn operation(&self, kind: &str, resource_name: &str) -> Option<&OperationToken> {
        self.long_running_operation_states
            .iter()
            .find(|t| t.matches(kind, resource_name))
    }

    /// Store a token, replacing any prior token for the same key
    pub fn set_operation(&mut self, token: OperationToken) {
        self.remove_operation(&token.kind, &token.resource_name);
        self.long_running_operation_states.push(token);
    }

    pub fn remove_operation(&mut self, kind: &str, resource_name: &str) {
        self.long_running_operation_states
            .retain(|t| !t.matches(kind, resource_name));
    }

    #[must_use]
    pub fn condition(&self, condition_type: &str) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.r#type == condition_type)
    }

    /// Apply a service condition; the transition time only moves when status flips
    pub fn set_service_condition(&mut self, service: &str, update: &ServiceCondition) {
        let condition_type = condition_type(service);
        let status = if update.ready { "True" } else { "False" }.to_string();
        let now = Utc::now().to_rfc3339();

        if let Some(existing) = self
            .conditions
            .iter_mut()
            .find(|c| c.r#type == condition_type)
        {
            if existing.status != status {
                existing.last_transition_time = Some(now);
            }
            existing.status = status;
            existing.reason = Some(update.reason);
            existing.message.clone_from(&update.message);
        } else {
            self.conditions.push(Condition {
                r#type: condition_type,
                status,
                last_transition_time: Some(now),
                reason: Some(update.reason),
                message: update.message.clone(),
            });
        }
    }
}

/// Condition type recorded for a service, e.g. `roleassignmentsReady`
#[must_use]
pub fn condition_type(service: &str) -> String {
    format!("{service}{CONDITION_TYPE_SUFFIX}")
}

/// In-memory [`AsyncStatusUpdater`] shared by all services of one invocation
#[derive(Debug, Clone, Default)]
pub struct SharedStatus {
    inner: Arc<Mutex<AsyncStatus>>,
}

impl SharedStatus {
    #[must_use]
    pub fn new(status: AsyncStatus) -> Self {
        Self {
            inner: Arc::new(Mutex::new(status)),
        }
    }

    /// Copy of the current state, ready to be persisted
    #[must_use]
    pub fn snapshot(&self) -> AsyncStatus {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, AsyncStatus> {
        // A panic while holding the lock cannot leave a token half-written
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AsyncStatusUpdater for SharedStatus {
    fn get_async_status(&self, kind: &str, resource_name: &str) -> Option<OperationToken> {
        self.lock().operation(kind, resource_name).cloned()
    }

    fn update_async_status(&self, kind: &str, resource_name: &str, token: Option<OperationToken>) {
        let mut status = self.lock();
        match token {
            Some(mut token) => {
                // Stored under the caller's key so a lookup by that key finds it
                token.kind = kind.to_string();
                token.resource_name = resource_name.to_string();
                status.set_operation(token);
            }
            None => status.remove_operation(kind, resource_name),
        }
    }

    fn update_service_condition(&self, service: &str, condition: ServiceCondition) {
        self.lock().set_service_condition(service, &condition);
    }
}
