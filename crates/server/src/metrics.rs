//! Prometheus metrics for the bedflow server.
//!
//! - HTTP request metrics (latency, counts, in-flight)
//! - Beds by status and waiting patients (collected on scrape)
//! - Everything registered by `bedflow_core::metrics`

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};
use tracing::warn;

use bedflow_core::{BedFilter, BedStatus, QueueFilter, QueueStatus};

use crate::state::AppState;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "bedflow_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("bedflow_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "bedflow_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Facility Metrics (collected dynamically)
// =============================================================================

/// Beds by current status.
pub static BEDS_BY_STATUS: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("bedflow_beds_by_status", "Current bed count by status"),
        &["status"],
    )
    .unwrap()
});

/// Patients waiting in the queue.
pub static QUEUE_WAITING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "bedflow_queue_waiting",
        "Number of patients currently waiting for a bed",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // Facility
    registry
        .register(Box::new(BEDS_BY_STATUS.clone()))
        .unwrap();
    registry.register(Box::new(QUEUE_WAITING.clone())).unwrap();

    // Core metrics (turnovers, assignment, sweeper)
    for metric in bedflow_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Refresh gauges from current facility state before a scrape.
pub fn collect_dynamic_metrics(state: &AppState) {
    let service = state.service();

    for status in [
        BedStatus::Available,
        BedStatus::Occupied,
        BedStatus::Cleaning,
        BedStatus::Maintenance,
        BedStatus::Reserved,
    ] {
        let filter = BedFilter::new().with_status(status).with_limit(i64::MAX);
        match service.list_beds(&filter) {
            Ok(beds) => BEDS_BY_STATUS
                .with_label_values(&[status.as_str()])
                .set(beds.len() as i64),
            Err(e) => warn!("Failed to count beds for metrics: {}", e),
        }
    }

    if let Ok(waiting) =
        service.count_queue(&QueueFilter::new().with_status(QueueStatus::Waiting))
    {
        QUEUE_WAITING.set(waiting);
    }
}

/// Normalize a path for metric labels (replace IDs with placeholders).
pub fn normalize_path(path: &str) -> String {
    static UUID: Lazy<regex_lite::Regex> = Lazy::new(|| {
        regex_lite::Regex::new(
            r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
        )
        .unwrap()
    });
    static NUMERIC: Lazy<regex_lite::Regex> =
        Lazy::new(|| regex_lite::Regex::new(r"/\d+(/|$)").unwrap());

    let result = UUID.replace_all(path, "{id}");
    let result = NUMERIC.replace_all(&result, "/{id}$1");
    result.to_string()
}
