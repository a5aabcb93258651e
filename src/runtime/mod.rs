//! # Runtime
//!
//! Glue between an orchestrator pass and a `kube-runtime` controller loop.
//!
//! - `backoff.rs` - Fibonacci backoff calculator
//! - `requeue.rs` - Maps pass results to requeue actions

pub mod backoff;
pub mod requeue;

pub use backoff::FibonacciBackoff;
pub use requeue::{BackoffState, RequeuePolicy};
