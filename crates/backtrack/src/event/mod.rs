mod audit;
mod bus;
mod types;

pub use audit::{
    AuditError, AuditLog, AuditOutcome, AuditRecord, DEFAULT_MAX_RECORDS, decode_records,
    encode_records,
};
pub use bus::{CompensationObserver, EventBus, ObserverId};
pub use types::CompensationEvent;
