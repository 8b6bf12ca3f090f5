use lazy_static::lazy_static;
use prometheus::{labels, register_int_counter_vec, IntCounterVec};

lazy_static! {
    static ref REVOCHECK_CHECKS: IntCounterVec = register_int_counter_vec!(
        "revocheck_checks_total",
        "revocation checks by oracle binding and outcome",
        &["binding", "outcome"]
    )
    .unwrap();
}

/// Counts one revocation check. `outcome` is a verdict or rejection label.
pub fn record_check(binding: &str, outcome: &str) {
    REVOCHECK_CHECKS.with_label_values(&[binding, outcome]).inc();
}

/// Function to push metrics to prometheus
/// # Arguments
/// * `host` - Host the chain was fetched from
/// * `prometheus_address` - Push gateway address
pub fn push_metrics(host: &str, prometheus_address: &str) {
    let metric_families = prometheus::gather();
    let result = prometheus::push_metrics(
        "revocheck",
        labels! {
            "instance".to_owned() => "revocheck".to_owned(),
            "host".to_owned() => host.to_owned(),
        },
        &format!("{}/metrics/job", prometheus_address),
        metric_families,
        None,
    );

    if let Err(e) = result {
        tracing::warn!("Failed to push metrics to prometheus: {}", e);
    }
}
