pub mod config;
pub mod error;
pub mod event;
pub mod history;
pub mod latency;
pub mod manager;
pub mod registry;
pub mod rewind;
pub mod simulation;
pub mod verify;

pub use config::{
    CompensationConfig, DEFAULT_COMPENSATION_WINDOW_MS, DEFAULT_TICK_RATE, MAX_BUFFER_CAPACITY,
};
pub use error::CompensationError;
pub use event::{
    AuditError, AuditLog, AuditOutcome, AuditRecord, CompensationEvent, CompensationObserver,
    EventBus, ObserverId,
};
pub use history::{Bounds, Bracket, Clamp, HistoryBuffer, RecordOutcome, Snapshot, Transform};
pub use latency::{ClientId, FixedLatency, LatencyEstimator, RttLatencyTable, sanitize_latency};
pub use manager::LagCompensator;
pub use registry::{EntityId, EntityRegistry, EntityTrack};
pub use rewind::{RewindResolver, RewindSource, RewoundState};
pub use simulation::{FixedTimestep, RecordStats, ServerClock, ServerTime, SimulationLoop, SnapshotRecorder};
pub use verify::{
    CandidateResult, CompensationFlags, CompensationWindow, HitReport, HitRequest, HitVerifier,
    TargetVolume, VerificationResult, WeaponShape,
};
