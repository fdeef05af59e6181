//! Prometheus metrics for settlement-service.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, HistogramVec, TextEncoder,
};

/// Payment intent counter by gateway mode.
pub static INTENTS_CREATED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "settlement_intents_created_total",
        "Total number of payment intents created",
        &["mode"] // live, mock
    )
    .expect("Failed to register intents_created_total")
});

/// Verification outcome counter.
pub static VERIFICATIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "settlement_verifications_total",
        "Total number of payment verification attempts",
        &["status"] // SUCCESS, FAILED, duplicate
    )
    .expect("Failed to register verifications_total")
});

/// Order counter by lifecycle event.
pub static ORDERS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "settlement_orders_total",
        "Total number of order lifecycle events",
        &["event"] // created, settled, cancelled
    )
    .expect("Failed to register orders_total")
});

/// Error counter for alerting.
pub static ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "settlement_errors_total",
        "Total number of errors by type",
        &["error_type"] // db_error, gateway_error, validation_error
    )
    .expect("Failed to register errors_total")
});

/// Database query duration histogram.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "settlement_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register db_query_duration")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&INTENTS_CREATED_TOTAL);
    Lazy::force(&VERIFICATIONS_TOTAL);
    Lazy::force(&ORDERS_TOTAL);
    Lazy::force(&ERRORS_TOTAL);
    Lazy::force(&DB_QUERY_DURATION);
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default()
}
