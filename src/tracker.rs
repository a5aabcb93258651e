//! # Operation Tracker
//!
//! Load, save and clear the outstanding [`OperationToken`] for a resource through
//! the caller's [`AsyncStatusUpdater`]. At most one token exists per
//! `(kind, resource_name)`; saving replaces whatever was there.

use std::sync::Arc;
use tracing::debug;

use crate::status::{AsyncStatusUpdater, OperationToken};

#[derive(Clone)]
pub struct OperationTracker {
    status: Arc<dyn AsyncStatusUpdater>,
}

impl std::fmt::Debug for OperationTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationTracker").finish_non_exhaustive()
    }
}

impl OperationTracker {
    #[must_use]
    pub fn new(status: Arc<dyn AsyncStatusUpdater>) -> Self {
        Self { status }
    }

    /// Outstanding operation for `(kind, resource_name)`, if any
    #[must_use]
    pub fn load(&self, kind: &str, resource_name: &str) -> Option<OperationToken> {
        self.status.get_async_status(kind, resource_name)
    }

    pub fn save(&self, token: OperationToken) {
        debug!(
            kind = %token.kind,
            resource.name = %token.resource_name,
            operation = %token.operation_type,
            "Tracking long-running operation"
        );
        let kind = token.kind.clone();
        let resource_name = token.resource_name.clone();
        self.status
            .update_async_status(&kind, &resource_name, Some(token));
    }

    pub fn clear(&self, kind: &str, resource_name: &str) {
        debug!(kind = %kind, resource.name = %resource_name, "Clearing tracked operation");
        self.status.update_async_status(kind, resource_name, None);
    }

    /// The underlying status store, for service-level condition updates
    #[must_use]
    pub fn status(&self) -> &Arc<dyn AsyncStatusUpdater> {
        &self.status
    }
}
