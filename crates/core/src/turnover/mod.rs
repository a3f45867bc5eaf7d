//! Bed turnovers: discharge, cleaning and hand-back.
//!
//! Progress is never stored; it is derived from the cleaning start time and
//! the estimate on every query, see [`compute_progress`].

mod config;
mod progress;
mod report;
mod tracker;
mod types;

pub use config::TurnoverConfig;
pub use progress::{compute_progress, TurnoverProgress};
pub use report::{BedStatusReport, CycleReport, EquipmentStatusReport};
pub use tracker::{CompletionOutcome, TurnoverTracker, TurnoverTransition};
pub use types::{
    BedTurnover, CleaningCycle, StartTurnoverRequest, TurnoverFilter, TurnoverStatus,
    TurnoverType,
};
