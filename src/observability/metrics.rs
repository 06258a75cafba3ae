//! # Metrics
//!
//! Prometheus metrics for monitoring the operator.
//!
//! ## Metrics Exposed
//!
//! - `argocd_operator_reconciliations_total{kind}` - Total number of reconciliations
//! - `argocd_operator_reconciliation_errors_total{kind,reason}` - Total number of reconciliation errors
//! - `argocd_operator_reconciliation_duration_seconds{kind}` - Duration of reconciliation operations
//! - `argocd_operator_managed_instances{kind}` - Current number of Argo CD instances being managed
//! - `argocd_operator_requeues_total{kind,trigger}` - Requeues by trigger source
//! - `argocd_operator_webhook_admissions_total{verdict}` - Admission reviews by verdict

use anyhow::Result;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "argocd_operator_reconciliations_total",
            "Total number of reconciliations",
        ),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "argocd_operator_reconciliation_errors_total",
            "Total number of reconciliation errors",
        ),
        &["kind", "reason"],
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "argocd_operator_reconciliation_duration_seconds",
            "Duration of reconciliation in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static MANAGED_INSTANCES: LazyLock<IntGaugeVec> = LazyLock::new(|| {
    IntGaugeVec::new(
        Opts::new(
            "argocd_operator_managed_instances",
            "Current number of Argo CD instances being managed",
        ),
        &["kind"],
    )
    .expect("Failed to create MANAGED_INSTANCES metric - this should never happen")
});

static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "argocd_operator_requeues_total",
            "Total number of requeues by trigger source",
        ),
        &["kind", "trigger"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

static WEBHOOK_ADMISSIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "argocd_operator_webhook_admissions_total",
            "Total number of admission reviews by verdict",
        ),
        &["verdict"],
    )
    .expect("Failed to create WEBHOOK_ADMISSIONS_TOTAL metric - this should never happen")
});

#[allow(
    clippy::missing_errors_doc,
    reason = "Error documentation is provided in doc comments"
)]
/// Register every metric with the registry served on `/metrics`
///
/// Fails if called twice.
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(MANAGED_INSTANCES.clone()))?;
    REGISTRY.register(Box::new(REQUEUES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(WEBHOOK_ADMISSIONS_TOTAL.clone()))?;
    Ok(())
}

/// Render the registry in the Prometheus text format
pub fn gather_text() -> Result<String> {
    let encoder = prometheus::TextEncoder::new();
    Ok(encoder.encode_to_string(&REGISTRY.gather())?)
}

pub fn increment_reconciliations(kind: &str) {
    RECONCILIATIONS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn increment_reconciliation_errors(kind: &str, reason: &str) {
    RECONCILIATION_ERRORS_TOTAL
        .with_label_values(&[kind, reason])
        .inc();
}

pub fn observe_reconciliation_duration(kind: &str, duration: f64) {
    RECONCILIATION_DURATION
        .with_label_values(&[kind])
        .observe(duration);
}

pub fn increment_managed_instances(kind: &str) {
    MANAGED_INSTANCES.with_label_values(&[kind]).inc();
}

pub fn decrement_managed_instances(kind: &str) {
    MANAGED_INSTANCES.with_label_values(&[kind]).dec();
}

pub fn increment_requeues_total(kind: &str, trigger: &str) {
    REQUEUES_TOTAL.with_label_values(&[kind, trigger]).inc();
}

pub fn increment_webhook_admissions(verdict: &str) {
    WEBHOOK_ADMISSIONS_TOTAL.with_label_values(&[verdict]).inc();
}
