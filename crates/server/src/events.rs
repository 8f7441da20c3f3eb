use std::time::Instant;

use backtrack::{CompensationEvent, EntityId, HitRequest};

/// A shot as it arrives from a client, after its trip across the network.
#[derive(Debug, Clone)]
pub struct ShotMessage {
    pub request: HitRequest,
    /// Target the client believed it was shooting, `None` for a deliberate miss.
    pub aimed_at: Option<EntityId>,
    pub sent_at: Instant,
}

pub fn log_event(event: &CompensationEvent) {
    match event {
        CompensationEvent::EntityRegistered { entity, time } => {
            log::debug!("entity {} registered at {}", entity, time);
        }
        CompensationEvent::EntityUnregistered { entity, time } => {
            log::debug!("entity {} unregistered at {}", entity, time);
        }
        CompensationEvent::TickRecorded { time, stats } => {
            if stats.rejected > 0 {
                log::warn!("tick {}: {} snapshots rejected", time, stats.rejected);
            }
        }
        CompensationEvent::HitVerified {
            attacker,
            target,
            compensation,
            hit,
            flags,
            ..
        } => {
            if flags.is_suspicious() {
                log::warn!(
                    "{} -> {}: hit={} rewound {:?} flags {:?}",
                    attacker,
                    target,
                    hit,
                    compensation,
                    flags
                );
            } else {
                log::trace!("{} -> {}: hit={} rewound {:?}", attacker, target, hit, compensation);
            }
        }
        CompensationEvent::CandidateRejected {
            attacker,
            target,
            reason,
            ..
        } => {
            log::debug!("{} -> {}: {}", attacker, target, reason);
        }
    }
}
