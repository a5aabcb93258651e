//! Resource Reconciler Library
//!
//! Asynchronous resource reconciliation for level-triggered control loops that
//! drive long-running operations on a remote provisioning API.
//!
//! ## Quick Start
//!
//! ```rust
//! use resource_reconciler::prelude::*;
//! ```
//!
//! This brings commonly used types and traits into scope. For more specific imports,
//! use the individual modules.

pub mod client;
pub mod config;
pub mod constants;
pub mod engine;
pub mod observability;
pub mod orchestrator;
pub mod prelude;
pub mod runtime;
pub mod services;
pub mod spec;
pub mod status;
pub mod tracker;
