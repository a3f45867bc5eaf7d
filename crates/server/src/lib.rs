//! HTTP surface for bedflow.

pub mod api;
pub mod metrics;
pub mod state;
