//! Turnover configuration.

use serde::{Deserialize, Serialize};

use super::TurnoverType;
use crate::error::{Result, TurnoverError};

/// Default cleaning durations and limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnoverConfig {
    /// Default estimate for a standard clean (minutes).
    #[serde(default = "default_standard_minutes")]
    pub standard_minutes: u32,

    /// Default estimate for a deep clean (minutes).
    #[serde(default = "default_deep_clean_minutes")]
    pub deep_clean_minutes: u32,

    /// Default estimate for a terminal clean after isolation (minutes).
    #[serde(default = "default_isolation_minutes")]
    pub isolation_minutes: u32,

    /// Upper bound accepted for any estimate (minutes).
    #[serde(default = "default_max_duration_minutes")]
    pub max_duration_minutes: u32,
}

fn default_standard_minutes() -> u32 {
    30
}

fn default_deep_clean_minutes() -> u32 {
    60
}

fn default_isolation_minutes() -> u32 {
    90
}

fn default_max_duration_minutes() -> u32 {
    24 * 60
}

impl Default for TurnoverConfig {
    fn default() -> Self {
        Self {
            standard_minutes: default_standard_minutes(),
            deep_clean_minutes: default_deep_clean_minutes(),
            isolation_minutes: default_isolation_minutes(),
            max_duration_minutes: default_max_duration_minutes(),
        }
    }
}

impl TurnoverConfig {
    /// Configured default estimate for a turnover type.
    pub fn default_minutes(&self, turnover_type: TurnoverType) -> u32 {
        match turnover_type {
            TurnoverType::Standard => self.standard_minutes,
            TurnoverType::DeepClean => self.deep_clean_minutes,
            TurnoverType::Isolation => self.isolation_minutes,
        }
    }

    /// Estimate to record for a new cleaning cycle.
    ///
    /// Falls back to the type default; rejects zero and anything above
    /// `max_duration_minutes`.
    pub fn resolve_minutes(
        &self,
        requested: Option<u32>,
        turnover_type: TurnoverType,
    ) -> Result<u32> {
        let minutes = requested.unwrap_or_else(|| self.default_minutes(turnover_type));
        if minutes == 0 {
            return Err(TurnoverError::Validation(
                "estimated duration must be positive".into(),
            ));
        }
        if minutes > self.max_duration_minutes {
            return Err(TurnoverError::Validation(format!(
                "estimated duration {} exceeds maximum of {} minutes",
                minutes, self.max_duration_minutes
            )));
        }
        Ok(minutes)
    }
}
