//! # Prelude
//!
//! Re-exports commonly used types and traits for convenience.
//!
//! ## Usage
//!
//! ```rust
//! use resource_reconciler::prelude::*;
//! ```
//!
//! This brings into scope:
//! - The adapter and spec traits needed to add a resource kind
//! - The engine, its outcomes and the deadline
//! - Services and the orchestrator
//! - Status types and the in-memory status store
//! - Configuration and the requeue policy

// Traits implemented per resource kind
pub use crate::client::{AsyncClient, ClientError, OperationHandle, Submission};
pub use crate::spec::{ResourceSpec, SpecProvider};

// Engine
pub use crate::engine::{
    AsyncReconciler, Deadline, ErrorKind, Progress, ReconcileError, ReconcileOutcome,
};
pub use crate::tracker::OperationTracker;

// Services and orchestration
pub use crate::orchestrator::{OrchestratorError, ServiceOrchestrator};
pub use crate::services::{DeletePolicy, ResourceService, ServiceReconciler};

// Status
pub use crate::status::{
    AsyncStatus, AsyncStatusUpdater, ConditionReason, OperationToken, OperationType,
    ServiceCondition, SharedStatus,
};

// Config and runtime
pub use crate::config::ReconcilerConfig;
pub use crate::runtime::RequeuePolicy;
