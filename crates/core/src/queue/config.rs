//! Queue configuration.

use serde::{Deserialize, Serialize};

/// How waiting entries are ranked for a freed bed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum QueueOrdering {
    /// `(priority desc, queued_at asc)`.
    #[default]
    Strict,
    /// Priority plus `aging_points_per_hour` for every hour waited.
    Aging,
}

/// Queue and assignment configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    #[serde(default)]
    pub ordering: QueueOrdering,

    /// Priority points added per hour of waiting when `ordering = "aging"`.
    #[serde(default = "default_aging_points_per_hour")]
    pub aging_points_per_hour: f64,

    /// Candidates tried after a conflicting assignment before giving up.
    #[serde(default = "default_max_assignment_retries")]
    pub max_assignment_retries: u32,
}

fn default_aging_points_per_hour() -> f64 {
    1.0
}

fn default_max_assignment_retries() -> u32 {
    3
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            ordering: QueueOrdering::default(),
            aging_points_per_hour: default_aging_points_per_hour(),
            max_assignment_retries: default_max_assignment_retries(),
        }
    }
}
