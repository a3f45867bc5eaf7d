//! Time-derived turnover progress.
//!
//! Nothing here is persisted: elapsed, remaining and progress are recomputed
//! from the stored cleaning start time on every query.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of a cleaning cycle at a given instant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TurnoverProgress {
    pub elapsed_minutes: f64,
    pub time_remaining_minutes: f64,
    /// Clamped to `[0, 100]`.
    pub progress_percentage: f64,
}

impl TurnoverProgress {
    /// True once the estimated duration has fully elapsed.
    pub fn is_complete(&self) -> bool {
        self.progress_percentage >= 100.0 || self.time_remaining_minutes <= 0.0
    }

    /// Copy rounded to one decimal place, for reports.
    ///
    /// An unfinished cycle never rounds to 100% or to zero minutes left, so
    /// a rounded report agrees with [`is_complete`](Self::is_complete).
    pub fn rounded(&self) -> Self {
        let mut progress_percentage = round1(self.progress_percentage);
        let mut time_remaining_minutes = round1(self.time_remaining_minutes);
        if !self.is_complete() {
            progress_percentage = progress_percentage.min(99.9);
            time_remaining_minutes = time_remaining_minutes.max(0.1);
        }
        Self {
            elapsed_minutes: round1(self.elapsed_minutes),
            time_remaining_minutes,
            progress_percentage,
        }
    }
}

/// Compute progress for a cycle that started at `cleaning_start` with an
/// estimated duration of `estimated_minutes`.
///
/// ```text
/// elapsed   = max(0, now - cleaning_start)
/// remaining = max(0, estimated - elapsed)
/// progress  = min(100, elapsed / estimated * 100)
/// ```
///
/// A zero estimate is treated as already complete.
pub fn compute_progress(
    cleaning_start: DateTime<Utc>,
    estimated_minutes: u32,
    now: DateTime<Utc>,
) -> TurnoverProgress {
    // Clock skew can put `now` before the start; clamp to zero elapsed.
    let elapsed_ms = (now - cleaning_start).num_milliseconds().max(0);
    let elapsed = elapsed_ms as f64 / 60_000.0;
    let estimated = f64::from(estimated_minutes);

    if estimated_minutes == 0 {
        return TurnoverProgress {
            elapsed_minutes: elapsed,
            time_remaining_minutes: 0.0,
            progress_percentage: 100.0,
        };
    }

    TurnoverProgress {
        elapsed_minutes: elapsed,
        time_remaining_minutes: (estimated - elapsed).max(0.0),
        progress_percentage: (elapsed / estimated * 100.0).min(100.0),
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
