//! Patients waiting for a bed.

mod config;
mod patient_queue;
mod selection;
mod types;

pub use config::{QueueConfig, QueueOrdering};
pub use patient_queue::PatientQueue;
pub use selection::{effective_priority, select_match};
pub use types::{EnqueueRequest, PatientQueueEntry, QueueCriteria, QueueFilter, QueueStatus};
