//! # Metrics
//!
//! Prometheus metrics for monitoring the reconciliation engine.
//!
//! ## Metrics Exposed
//!
//! - `resource_reconciler_operations_total` - Engine operations by service, operation and outcome
//! - `resource_reconciler_operation_duration_seconds` - Duration of engine operations
//! - `resource_reconciler_lro_submissions_total` - Long-running operations submitted to the remote API
//! - `resource_reconciler_config_warnings_total` - Non-fatal configuration anomalies (e.g. empty names)
//! - `resource_reconciler_service_errors_total` - Service failures by error kind
//! - `resource_reconciler_requeues_total` - Requeue decisions by reason

use anyhow::{Context, Result};
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "resource_reconciler_operations_total",
            "Total number of engine operations",
        ),
        &["service", "operation", "outcome"],
    )
    .expect("Failed to create OPERATIONS_TOTAL metric - this should never happen")
});

static OPERATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "resource_reconciler_operation_duration_seconds",
            "Duration of engine operations in seconds",
        )
        .buckets(vec![0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
        &["service", "operation"],
    )
    .expect("Failed to create OPERATION_DURATION metric - this should never happen")
});

static LRO_SUBMISSIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "resource_reconciler_lro_submissions_total",
            "Total number of long-running operations submitted to the remote API",
        ),
        &["service"],
    )
    .expect("Failed to create LRO_SUBMISSIONS_TOTAL metric - this should never happen")
});

static CONFIG_WARNINGS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "resource_reconciler_config_warnings_total",
            "Total number of non-fatal configuration anomalies",
        ),
        &["service"],
    )
    .expect("Failed to create CONFIG_WARNINGS_TOTAL metric - this should never happen")
});

static SERVICE_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "resource_reconciler_service_errors_total",
            "Total number of service failures",
        ),
        &["service", "kind"],
    )
    .expect("Failed to create SERVICE_ERRORS_TOTAL metric - this should never happen")
});

static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "resource_reconciler_requeues_total",
            "Total number of requeue decisions",
        ),
        &["reason"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

/// Register all metrics with the crate registry
///
/// Call once at startup. Recording works without registration, the values just
/// will not show up in `gather_metrics`.
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(OPERATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(OPERATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(LRO_SUBMISSIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(CONFIG_WARNINGS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SERVICE_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(REQUEUES_TOTAL.clone()))?;

    Ok(())
}

/// Encode the registry in the Prometheus text exposition format
pub fn gather_metrics() -> Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&REGISTRY.gather(), &mut buffer)
        .context("Failed to encode metrics")?;
    String::from_utf8(buffer).context("Metrics output is not valid UTF-8")
}

pub fn record_operation(service: &str, operation: &str, outcome: &str, duration: f64) {
    OPERATIONS_TOTAL
        .with_label_values(&[service, operation, outcome])
        .inc();
    OPERATION_DURATION
        .with_label_values(&[service, operation])
        .observe(duration);
}

pub fn increment_lro_submissions(service: &str) {
    LRO_SUBMISSIONS_TOTAL.with_label_values(&[service]).inc();
}

pub fn increment_config_warnings(service: &str) {
    CONFIG_WARNINGS_TOTAL.with_label_values(&[service]).inc();
}

#[must_use]
pub fn config_warnings(service: &str) -> u64 {
    CONFIG_WARNINGS_TOTAL.with_label_values(&[service]).get()
}

pub fn increment_service_errors(service: &str, kind: &str) {
    SERVICE_ERRORS_TOTAL
        .with_label_values(&[service, kind])
        .inc();
}

pub fn increment_requeues_total(reason: &str) {
    REQUEUES_TOTAL.with_label_values(&[reason]).inc();
}
