//! # Status Persistence
//!
//! Stores `AsyncStatus` under `.status.asyncOperations` of a Kubernetes object.
//!
//! The owning object's CRD must declare the field (for example by embedding
//! [`AsyncStatus`] in its status struct, which derives `JsonSchema`).

use anyhow::{Context, Result};
use kube::api::{Api, Patch, PatchParams};
use kube::Resource;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::constants::{ASYNC_STATUS_FIELD, FIELD_MANAGER};
use crate::status::AsyncStatus;

/// Read the persisted async status from any serializable Kubernetes object
///
/// Objects that have never been reconciled yield an empty status. So does a
/// malformed field, with a warning: every tracked operation is forgotten and
/// reconciliation falls back to `get`.
pub fn load_async_status<K: Serialize>(object: &K) -> AsyncStatus {
    let value = match serde_json::to_value(object) {
        Ok(value) => value,
        Err(e) => {
            warn!("Failed to serialize object, ignoring persisted async status: {}", e);
            return AsyncStatus::default();
        }
    };

    let Some(field) = value
        .get("status")
        .and_then(|status| status.get(ASYNC_STATUS_FIELD))
    else {
        return AsyncStatus::default();
    };

    match serde_json::from_value(field.clone()) {
        Ok(status) => status,
        Err(e) => {
            warn!(
                "Malformed status.{}, tracked operations will be re-derived: {}",
                ASYNC_STATUS_FIELD, e
            );
            AsyncStatus::default()
        }
    }
}

/// Build the merge patch written to the status subresource
///
/// Both lists are always present: a JSON merge patch replaces arrays wholesale, so
/// an empty list is what removes tokens cleared during the invocation.
#[must_use]
pub fn async_status_patch(status: &AsyncStatus) -> serde_json::Value {
    serde_json::json!({
        "status": {
            ASYNC_STATUS_FIELD: {
                "longRunningOperationStates": status.long_running_operation_states,
                "conditions": status.conditions,
            }
        }
    })
}

/// Persist the async status of `name` through the status subresource
pub async fn patch_async_status<K>(api: &Api<K>, name: &str, status: &AsyncStatus) -> Result<K>
where
    K: Resource + Clone + DeserializeOwned + std::fmt::Debug,
{
    let patch = async_status_patch(status);
    let params = PatchParams::apply(FIELD_MANAGER);

    let updated = api
        .patch_status(name, &params, &Patch::Merge(&patch))
        .await
        .with_context(|| format!("Failed to persist async status for {name}"))?;

    debug!(
        "Persisted async status for {} ({} operations in flight)",
        name,
        status.long_running_operation_states.len()
    );
    Ok(updated)
}
