//! Bed and equipment turnover tracking with patient queue assignment.

pub mod assignment;
pub mod audit;
pub mod bed;
pub mod clock;
pub mod config;
pub mod equipment;
pub mod error;
pub mod locks;
pub mod metrics;
pub mod queue;
pub mod readiness;
pub mod service;
pub mod store;
pub mod sweeper;
pub mod testing;
pub mod turnover;

pub use assignment::{Assignment, AssignmentCoordinator};
pub use audit::{
    create_audit_system, create_audit_system_with_clock, AuditError, AuditEvent, AuditFilter,
    AuditHandle, AuditRecord, AuditStore, AuditWriter, CompletedBy, SqliteAuditStore,
};
pub use bed::{
    Bed, BedFilter, BedRegistry, BedStatus, BedType, CreateBedRequest, CreateRoomRequest, Room,
};
pub use clock::{Clock, SystemClock};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, DatabaseConfig,
    SanitizedConfig, ServerConfig,
};
pub use equipment::{
    CreateEquipmentRequest, Equipment, EquipmentFilter, EquipmentRegistry, EquipmentStatus,
    EquipmentTurnover, EquipmentTurnoverTracker, StartCleaningRequest,
};
pub use error::{EntityKind, Result, TurnoverError};
pub use locks::KeyedLocks;
pub use queue::{
    EnqueueRequest, PatientQueue, PatientQueueEntry, QueueConfig, QueueCriteria, QueueFilter,
    QueueOrdering, QueueStatus,
};
pub use readiness::{room_readiness, RoomReadiness};
pub use service::TurnoverService;
pub use store::{FacilityStore, SqliteFacilityStore};
pub use sweeper::{SweepReport, SweeperConfig, TurnoverSweeper};
pub use turnover::{
    BedStatusReport, BedTurnover, CompletionOutcome, EquipmentStatusReport, StartTurnoverRequest,
    TurnoverConfig, TurnoverFilter, TurnoverStatus, TurnoverType,
};
