//! Error taxonomy shared by the turnover components.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of entity an error or audit event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Room,
    Bed,
    Equipment,
    Patient,
    QueueEntry,
    Turnover,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Room => "room",
            EntityKind::Bed => "bed",
            EntityKind::Equipment => "equipment",
            EntityKind::Patient => "patient",
            EntityKind::QueueEntry => "queue entry",
            EntityKind::Turnover => "turnover",
        }
    }

    /// Stable snake_case name used in storage and query strings.
    pub fn code(&self) -> &'static str {
        match self {
            EntityKind::Room => "room",
            EntityKind::Bed => "bed",
            EntityKind::Equipment => "equipment",
            EntityKind::Patient => "patient",
            EntityKind::QueueEntry => "queue_entry",
            EntityKind::Turnover => "turnover",
        }
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "room" => Ok(EntityKind::Room),
            "bed" => Ok(EntityKind::Bed),
            "equipment" => Ok(EntityKind::Equipment),
            "patient" => Ok(EntityKind::Patient),
            "queue_entry" => Ok(EntityKind::QueueEntry),
            "turnover" => Ok(EntityKind::Turnover),
            other => Err(format!("unknown entity kind: {}", other)),
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type for turnover, queue and assignment operations.
#[derive(Debug, Error)]
pub enum TurnoverError {
    /// The referenced entity does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    /// The operation is not permitted from the entity's current state.
    #[error("cannot {operation} {kind} {id}: current status is {current}")]
    InvalidTransition {
        kind: EntityKind,
        id: String,
        current: String,
        operation: String,
    },

    /// Another writer changed the bed (or claimed the patient) first.
    #[error("conflicting assignment on bed {bed_id}: {reason}")]
    ConflictingAssignment { bed_id: String, reason: String },

    /// Malformed input.
    #[error("validation failed: {0}")]
    Validation(String),

    /// No available bed and waiting patient pair up.
    #[error("no compatible match: {0}")]
    NoCompatibleBed(String),

    /// Storage failure.
    #[error("database error: {0}")]
    Database(String),
}

impl TurnoverError {
    pub fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn invalid_transition(
        kind: EntityKind,
        id: impl Into<String>,
        current: impl fmt::Display,
        operation: impl Into<String>,
    ) -> Self {
        Self::InvalidTransition {
            kind,
            id: id.into(),
            current: current.to_string(),
            operation: operation.into(),
        }
    }

    pub fn conflict(bed_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConflictingAssignment {
            bed_id: bed_id.into(),
            reason: reason.into(),
        }
    }

    /// Short machine-readable name of the error kind.
    pub fn kind_name(&self) -> &'static str {
        match self {
            TurnoverError::NotFound { .. } => "not_found",
            TurnoverError::InvalidTransition { .. } => "invalid_transition",
            TurnoverError::ConflictingAssignment { .. } => "conflicting_assignment",
            TurnoverError::Validation(_) => "validation_error",
            TurnoverError::NoCompatibleBed(_) => "no_compatible_bed",
            TurnoverError::Database(_) => "database_error",
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, TurnoverError::ConflictingAssignment { .. })
    }
}

impl From<rusqlite::Error> for TurnoverError {
    fn from(e: rusqlite::Error) -> Self {
        TurnoverError::Database(e.to_string())
    }
}

impl From<serde_json::Error> for TurnoverError {
    fn from(e: serde_json::Error) -> Self {
        TurnoverError::Database(e.to_string())
    }
}

pub type Result<T, E = TurnoverError> = std::result::Result<T, E>;

/// Unknown textual value for a status or type enum.
#[derive(Debug, Clone, Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

impl ParseEnumError {
    pub fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TurnoverError::not_found(EntityKind::Bed, "bed-1");
        assert_eq!(err.to_string(), "bed not found: bed-1");

        let err = TurnoverError::invalid_transition(
            EntityKind::Bed,
            "bed-1",
            "available",
            "complete cleaning on",
        );
        assert_eq!(
            err.to_string(),
            "cannot complete cleaning on bed bed-1: current status is available"
        );

        let err = TurnoverError::NoCompatibleBed("no available bed matches patient p-7".into());
        assert_eq!(
            err.to_string(),
            "no compatible match: no available bed matches patient p-7"
        );
    }

    #[test]
    fn test_kind_name() {
        assert_eq!(
            TurnoverError::conflict("b", "version changed").kind_name(),
            "conflicting_assignment"
        );
        assert_eq!(
            TurnoverError::Validation("x".into()).kind_name(),
            "validation_error"
        );
        assert!(TurnoverError::conflict("b", "r").is_conflict());
        assert!(!TurnoverError::Database("x".into()).is_conflict());
    }
}
