//! Periodic auto-completion of elapsed cleaning cycles.
//!
//! Optional: status queries never depend on it, since progress is derived
//! from timestamps. When enabled, every tick completes each bed and
//! equipment turnover whose estimate has run out.

mod config;
mod runner;

pub use config::SweeperConfig;
pub use runner::{SweepReport, TurnoverSweeper};
