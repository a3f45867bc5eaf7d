use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::bed::Bed;
use crate::queue::PatientQueueEntry;

/// A committed bed assignment: the now-occupied bed and the resolved entry.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Assignment {
    pub bed: Bed,
    pub entry: PatientQueueEntry,
}

impl Assignment {
    pub fn patient_id(&self) -> &str {
        &self.entry.patient_id
    }

    /// Minutes between queueing and `at`.
    pub fn waited_minutes(&self, at: DateTime<Utc>) -> f64 {
        (at - self.entry.queued_at).num_milliseconds().max(0) as f64 / 60_000.0
    }
}
