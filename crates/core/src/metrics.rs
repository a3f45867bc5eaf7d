//! Prometheus metrics for the turnover core.
//!
//! Covers bed and equipment cleaning cycles, queue-to-bed assignment and the
//! periodic sweeper. The server registers everything from [`all_metrics`].

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Turnovers
// =============================================================================

/// Cleaning cycles started, by subject ("bed", "equipment") and turnover type.
pub static TURNOVERS_STARTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("bedflow_turnovers_started_total", "Total cleaning cycles started"),
        &["subject", "turnover_type"],
    )
    .unwrap()
});

/// Cleaning cycles completed, by subject and trigger ("staff", "sweeper").
pub static TURNOVERS_COMPLETED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "bedflow_turnovers_completed_total",
            "Total cleaning cycles completed",
        ),
        &["subject", "completed_by"],
    )
    .unwrap()
});

/// Cleaning cycles cancelled, by subject.
pub static TURNOVERS_CANCELLED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "bedflow_turnovers_cancelled_total",
            "Total cleaning cycles cancelled",
        ),
        &["subject"],
    )
    .unwrap()
});

/// Actual cleaning duration in minutes.
pub static TURNOVER_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "bedflow_turnover_duration_minutes",
            "Minutes from cleaning start to completion",
        )
        .buckets(vec![
            5.0, 10.0, 15.0, 20.0, 30.0, 45.0, 60.0, 90.0, 120.0, 240.0,
        ]),
        &["subject", "turnover_type"],
    )
    .unwrap()
});

// =============================================================================
// Queue & assignment
// =============================================================================

/// Patients added to the queue.
pub static PATIENTS_QUEUED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("bedflow_patients_queued_total", "Total patients queued").unwrap()
});

/// Assignment attempts by result ("assigned", "no_match", "exhausted").
pub static ASSIGNMENT_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "bedflow_assignment_attempts_total",
            "Total bed assignment attempts",
        ),
        &["result"],
    )
    .unwrap()
});

/// Candidates skipped after losing a race.
pub static ASSIGNMENT_CONFLICTS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "bedflow_assignment_conflicts_total",
        "Total conflicting assignments retried",
    )
    .unwrap()
});

/// Time from queueing to assignment in minutes.
pub static QUEUE_WAIT: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "bedflow_queue_wait_minutes",
            "Minutes a patient waited before assignment",
        )
        .buckets(vec![
            1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 240.0, 480.0, 1440.0,
        ]),
        &[],
    )
    .unwrap()
});

// =============================================================================
// Sweeper
// =============================================================================

/// Sweeper ticks by result ("ok", "error").
pub static SWEEPER_TICKS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("bedflow_sweeper_ticks_total", "Total sweeper ticks"),
        &["result"],
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(TURNOVERS_STARTED.clone()),
        Box::new(TURNOVERS_COMPLETED.clone()),
        Box::new(TURNOVERS_CANCELLED.clone()),
        Box::new(TURNOVER_DURATION.clone()),
        Box::new(PATIENTS_QUEUED.clone()),
        Box::new(ASSIGNMENT_ATTEMPTS.clone()),
        Box::new(ASSIGNMENT_CONFLICTS.clone()),
        Box::new(QUEUE_WAIT.clone()),
        Box::new(SWEEPER_TICKS.clone()),
    ]
}
