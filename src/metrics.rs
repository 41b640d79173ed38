// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the MTV integrations operator.
//!
//! Every metric is prefixed with `mtv_integrations_` and registered lazily in
//! [`METRICS_REGISTRY`], which the metrics server encodes on each scrape.
//!
//! | Metric | Labels |
//! |--------|--------|
//! | `reconciliations_total` | `resource_type`, `status` (`success`, `error`, `requeue`, `skipped`) |
//! | `reconciliation_duration_seconds` | `resource_type` |
//! | `requeues_total` | `resource_type`, `reason` |
//! | `resources_created_total`, `resources_updated_total`, `resources_deleted_total` | `resource_type` |
//! | `errors_total` | `resource_type`, `error_type` |
//! | `admission_decisions_total` | `decision` (`allowed`, `denied`), `reason` |
//! | `leader_elections_total` | `status` (`acquired`, `lost`) |
//! | `leader_status` | `pod_name` |
//!
//! # Example
//!
//! ```rust,no_run
//! use mtv_integrations::metrics::record_reconciliation_success;
//!
//! record_reconciliation_success("ManagedCluster", std::time::Duration::from_secs(1));
//! ```

use prometheus::core::Collector;
use prometheus::{
    CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::sync::LazyLock;
use std::time::Duration;

const METRICS_NAMESPACE: &str = "mtv_integrations";

/// Reconcile latency buckets, from a no-op pass to a slow API server.
const DURATION_BUCKETS: &[f64] = &[0.005, 0.025, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 15.0, 60.0];

/// Registry served at `/metrics`.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

fn register<M: Collector + Clone + 'static>(metric: M) -> M {
    METRICS_REGISTRY
        .register(Box::new(metric.clone()))
        .expect("metric names are unique");
    metric
}

fn counter(name: &str, help: &str, labels: &[&str]) -> CounterVec {
    let opts = Opts::new(format!("{METRICS_NAMESPACE}_{name}"), help);
    register(CounterVec::new(opts, labels).expect("counter options are valid"))
}

pub static RECONCILIATION_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter(
        "reconciliations_total",
        "Reconciliation passes by resource type and outcome",
        &["resource_type", "status"],
    )
});

pub static RECONCILIATION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_reconciliation_duration_seconds"),
        "Wall time of reconciliation passes by resource type",
    )
    .buckets(DURATION_BUCKETS.to_vec());
    register(HistogramVec::new(opts, &["resource_type"]).expect("histogram options are valid"))
});

pub static REQUEUE_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter(
        "requeues_total",
        "Explicit requeues by resource type and reason",
        &["resource_type", "reason"],
    )
});

pub static RESOURCES_CREATED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter(
        "resources_created_total",
        "Downstream resources created by kind",
        &["resource_type"],
    )
});

pub static RESOURCES_UPDATED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter(
        "resources_updated_total",
        "Downstream resources updated by kind",
        &["resource_type"],
    )
});

pub static RESOURCES_DELETED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter(
        "resources_deleted_total",
        "Downstream resources deleted by kind",
        &["resource_type"],
    )
});

pub static ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter(
        "errors_total",
        "Failed reconciliation passes by resource type and error category",
        &["resource_type", "error_type"],
    )
});

pub static ADMISSION_DECISIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter(
        "admission_decisions_total",
        "Plan admission reviews by decision and reason",
        &["decision", "reason"],
    )
});

pub static LEADER_ELECTIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter(
        "leader_elections_total",
        "Leader lease transitions by status",
        &["status"],
    )
});

/// 1 while the pod holds the leader lease, 0 otherwise.
pub static LEADER_STATUS: LazyLock<GaugeVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_leader_status"),
        "Whether this pod holds the leader lease",
    );
    register(GaugeVec::new(opts, &["pod_name"]).expect("gauge options are valid"))
});

fn record_pass(resource_type: &str, status: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, status])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[resource_type])
        .observe(duration.as_secs_f64());
}

pub fn record_reconciliation_success(resource_type: &str, duration: Duration) {
    record_pass(resource_type, "success", duration);
}

pub fn record_reconciliation_error(resource_type: &str, duration: Duration) {
    record_pass(resource_type, "error", duration);
}

/// Record a pass skipped because the prerequisite CRD is not established.
pub fn record_reconciliation_skipped(resource_type: &str) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "skipped"])
        .inc();
}

/// Record an explicit requeue, e.g. `token_issuance`.
pub fn record_reconciliation_requeue(resource_type: &str, reason: &str) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "requeue"])
        .inc();
    REQUEUE_TOTAL
        .with_label_values(&[resource_type, reason])
        .inc();
}

pub fn record_resource_created(resource_type: &str) {
    RESOURCES_CREATED_TOTAL
        .with_label_values(&[resource_type])
        .inc();
}

pub fn record_resource_updated(resource_type: &str) {
    RESOURCES_UPDATED_TOTAL
        .with_label_values(&[resource_type])
        .inc();
}

pub fn record_resource_deleted(resource_type: &str) {
    RESOURCES_DELETED_TOTAL
        .with_label_values(&[resource_type])
        .inc();
}

/// Record a failed pass under `error_type` (see `ReconcileError::category`).
pub fn record_error(resource_type: &str, error_type: &str) {
    ERRORS_TOTAL
        .with_label_values(&[resource_type, error_type])
        .inc();
}

pub fn record_admission_decision(allowed: bool, reason: &str) {
    let decision = if allowed { "allowed" } else { "denied" };
    ADMISSION_DECISIONS_TOTAL
        .with_label_values(&[decision, reason])
        .inc();
}

pub fn record_leader_elected(pod_name: &str) {
    LEADER_ELECTIONS_TOTAL
        .with_label_values(&["acquired"])
        .inc();
    LEADER_STATUS.with_label_values(&[pod_name]).set(1.0);
}

pub fn record_leader_lost(pod_name: &str) {
    LEADER_ELECTIONS_TOTAL.with_label_values(&["lost"]).inc();
    LEADER_STATUS.with_label_values(&[pod_name]).set(0.0);
}

/// Encode the registry in the Prometheus text format.
///
/// # Errors
///
/// Returns an error if encoding fails.
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&METRICS_REGISTRY.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}
