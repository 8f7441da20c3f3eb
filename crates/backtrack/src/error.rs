use crate::registry::EntityId;
use crate::simulation::ServerTime;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompensationError {
    #[error("entity {0} is not compensable")]
    EntityNotCompensable(EntityId),
    #[error("entity {0} is already registered")]
    AlreadyRegistered(EntityId),
    #[error("entity {0} has no recorded history yet")]
    BufferUnderflow(EntityId),
    #[error("timestamp {requested} outside compensation window [{oldest}, {newest}]")]
    TimestampOutOfWindow {
        requested: ServerTime,
        oldest: ServerTime,
        newest: ServerTime,
    },
    #[error("snapshot at {timestamp} is older than newest recorded {newest}")]
    NonMonotonicTimestamp {
        timestamp: ServerTime,
        newest: ServerTime,
    },
    #[error("transform for entity {0} is not finite")]
    InvalidTransform(EntityId),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
