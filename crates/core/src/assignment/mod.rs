//! Pairing freed beds with waiting patients.

mod coordinator;
mod types;

pub use coordinator::AssignmentCoordinator;
pub use types::Assignment;
