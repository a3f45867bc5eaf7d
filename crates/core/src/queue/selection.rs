//! Ranking of waiting entries against a freed bed.

use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::{DateTime, Utc};

use super::{PatientQueueEntry, QueueConfig, QueueOrdering, QueueStatus};
use crate::bed::Bed;

/// Priority used for ranking at `now`.
///
/// Under [`QueueOrdering::Aging`] every hour waited adds
/// `aging_points_per_hour`, so long waits eventually outrank new urgent
/// arrivals.
pub fn effective_priority(
    entry: &PatientQueueEntry,
    config: &QueueConfig,
    now: DateTime<Utc>,
) -> f64 {
    let base = f64::from(entry.priority);
    match config.ordering {
        QueueOrdering::Strict => base,
        QueueOrdering::Aging => {
            let waited_ms = (now - entry.queued_at).num_milliseconds().max(0);
            let hours = waited_ms as f64 / 3_600_000.0;
            base + hours * config.aging_points_per_hour
        }
    }
}

fn rank(
    a: &PatientQueueEntry,
    b: &PatientQueueEntry,
    config: &QueueConfig,
    now: DateTime<Utc>,
) -> Ordering {
    effective_priority(b, config, now)
        .total_cmp(&effective_priority(a, config, now))
        .then_with(|| a.queued_at.cmp(&b.queued_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Best waiting entry compatible with `bed`, skipping ids in `excluded`.
///
/// Highest priority wins, ties go to the earliest `queued_at`, then the
/// lowest id so the result is deterministic. Nothing is mutated.
pub fn select_match<'a>(
    entries: &'a [PatientQueueEntry],
    bed: &Bed,
    config: &QueueConfig,
    now: DateTime<Utc>,
    excluded: &HashSet<String>,
) -> Option<&'a PatientQueueEntry> {
    entries
        .iter()
        .filter(|e| e.status == QueueStatus::Waiting)
        .filter(|e| !excluded.contains(&e.id))
        .filter(|e| e.criteria.matches(bed))
        .min_by(|a, b| rank(a, b, config, now))
}
