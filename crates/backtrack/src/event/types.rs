use std::time::Duration;

use crate::error::CompensationError;
use crate::latency::ClientId;
use crate::registry::EntityId;
use crate::simulation::{RecordStats, ServerTime};
use crate::verify::CompensationFlags;

#[derive(Debug, Clone, PartialEq)]
pub enum CompensationEvent {
    EntityRegistered {
        entity: EntityId,
        time: ServerTime,
    },
    EntityUnregistered {
        entity: EntityId,
        time: ServerTime,
    },
    TickRecorded {
        time: ServerTime,
        stats: RecordStats,
    },
    /// One candidate of a hit request, after rewinding and testing.
    HitVerified {
        attacker: ClientId,
        target: EntityId,
        client_action_time: ServerTime,
        rewound_timestamp: ServerTime,
        compensation: Duration,
        latency_ms: f32,
        hit: bool,
        flags: CompensationFlags,
    },
    /// A candidate that could not be rewound at all.
    CandidateRejected {
        attacker: ClientId,
        target: EntityId,
        client_action_time: ServerTime,
        reason: CompensationError,
    },
}

impl CompensationEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EntityRegistered { .. } => "entity_registered",
            Self::EntityUnregistered { .. } => "entity_unregistered",
            Self::TickRecorded { .. } => "tick_recorded",
            Self::HitVerified { .. } => "hit_verified",
            Self::CandidateRejected { .. } => "candidate_rejected",
        }
    }

    pub fn flags(&self) -> CompensationFlags {
        match self {
            Self::HitVerified { flags, .. } => *flags,
            _ => CompensationFlags::empty(),
        }
    }
}
