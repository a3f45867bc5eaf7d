//! Audit trail: every state change is emitted as an [`AuditEvent`] and
//! persisted by a background [`AuditWriter`].

mod events;
mod handle;
mod sqlite;
mod store;
mod writer;

pub use events::*;
pub use handle::*;
pub use sqlite::*;
pub use store::*;
pub use writer::*;
