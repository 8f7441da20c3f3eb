use std::time::Duration;

use bitflags::bitflags;
use glam::Vec3;

use crate::error::CompensationError;
use crate::latency::ClientId;
use crate::registry::EntityId;
use crate::rewind::{RewindSource, RewoundState};
use crate::simulation::ServerTime;

use super::intersect::Contact;
use super::shape::WeaponShape;

bitflags! {
    /// Anomalies noticed while compensating one request; kept for anti-cheat telemetry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CompensationFlags: u8 {
        const OUT_OF_WINDOW = 1 << 0;
        const FUTURE_TIMESTAMP = 1 << 1;
        const LATENCY_CLAMPED = 1 << 2;
        const LIVE_FALLBACK = 1 << 3;
        const INVALID_SHAPE = 1 << 4;
    }
}

impl CompensationFlags {
    pub const SUSPICIOUS: Self = Self::OUT_OF_WINDOW
        .union(Self::FUTURE_TIMESTAMP)
        .union(Self::LATENCY_CLAMPED)
        .union(Self::INVALID_SHAPE);

    pub fn is_suspicious(self) -> bool {
        self.intersects(Self::SUSPICIOUS)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HitRequest {
    pub attacker: ClientId,
    pub shape: WeaponShape,
    pub candidates: Vec<EntityId>,
    /// The attacker's claim, on the server timeline. Never trusted as-is.
    pub client_action_time: ServerTime,
}

impl HitRequest {
    pub fn new(attacker: ClientId, shape: WeaponShape, client_action_time: ServerTime) -> Self {
        Self {
            attacker,
            shape,
            candidates: Vec::new(),
            client_action_time,
        }
    }

    pub fn with_candidates(mut self, candidates: impl IntoIterator<Item = EntityId>) -> Self {
        self.candidates.extend(candidates);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerificationResult {
    pub hit: bool,
    pub hit_point: Option<Vec3>,
    pub distance: Option<f32>,
    /// The clamped time the target was actually rewound to.
    pub rewound_timestamp: ServerTime,
    pub source: RewindSource,
}

impl VerificationResult {
    pub(crate) fn from_contact(
        state: &RewoundState,
        rewound_timestamp: ServerTime,
        contact: Option<Contact>,
    ) -> Self {
        Self {
            hit: contact.is_some(),
            hit_point: contact.map(|c| c.point),
            distance: contact.map(|c| c.distance),
            rewound_timestamp,
            source: state.source,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CandidateResult {
    pub entity: EntityId,
    pub outcome: Result<VerificationResult, CompensationError>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HitReport {
    pub attacker: ClientId,
    pub client_action_time: ServerTime,
    pub now: ServerTime,
    pub rewound_timestamp: ServerTime,
    pub latency_ms: f32,
    pub flags: CompensationFlags,
    pub candidates: Vec<CandidateResult>,
    /// Closest hit; ties go to the lowest entity id.
    pub best: Option<EntityId>,
}

impl HitReport {
    pub fn is_hit(&self) -> bool {
        self.best.is_some()
    }

    pub fn compensation(&self) -> Duration {
        self.now.duration_since(self.rewound_timestamp)
    }

    pub fn result_for(
        &self,
        entity: EntityId,
    ) -> Option<&Result<VerificationResult, CompensationError>> {
        self.candidates
            .iter()
            .find(|c| c.entity == entity)
            .map(|c| &c.outcome)
    }

    /// Request-wide flags plus `LIVE_FALLBACK` only when this candidate used it.
    pub fn flags_for(&self, result: &VerificationResult) -> CompensationFlags {
        let mut flags = self.flags - CompensationFlags::LIVE_FALLBACK;
        if result.source == RewindSource::LiveFallback {
            flags |= CompensationFlags::LIVE_FALLBACK;
        }
        flags
    }

    pub fn best_result(&self) -> Option<(EntityId, &VerificationResult)> {
        let best = self.best?;
        match self.result_for(best)? {
            Ok(result) => Some((best, result)),
            Err(_) => None,
        }
    }

    pub fn hits(&self) -> impl Iterator<Item = (EntityId, &VerificationResult)> {
        self.candidates.iter().filter_map(|c| match &c.outcome {
            Ok(result) if result.hit => Some((c.entity, result)),
            _ => None,
        })
    }

    pub fn skipped(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.candidates
            .iter()
            .filter(|c| c.outcome.is_err())
            .map(|c| c.entity)
    }
}
