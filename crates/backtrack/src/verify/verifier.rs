use std::collections::HashSet;
use std::time::Duration;

use crate::config::CompensationConfig;
use crate::error::CompensationError;
use crate::latency::{LatencyEstimator, SanitizedLatency, sanitize_latency};
use crate::registry::{EntityId, EntityRegistry};
use crate::rewind::{RewindResolver, RewindSource};
use crate::simulation::ServerTime;

use super::intersect;
use super::report::{CandidateResult, CompensationFlags, HitReport, HitRequest, VerificationResult};
use super::shape::{TargetVolume, WeaponShape};

/// The range `[now - window, now]` every rewind is confined to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompensationWindow {
    oldest: ServerTime,
    now: ServerTime,
}

impl CompensationWindow {
    pub fn new(now: ServerTime, max_window: Duration) -> Self {
        Self {
            oldest: now.saturating_sub(max_window),
            now,
        }
    }

    pub fn oldest(&self) -> ServerTime {
        self.oldest
    }

    pub fn now(&self) -> ServerTime {
        self.now
    }

    pub fn contains(&self, time: ServerTime) -> bool {
        time >= self.oldest && time <= self.now
    }

    pub fn check(&self, time: ServerTime) -> Result<ServerTime, CompensationError> {
        if self.contains(time) {
            Ok(time)
        } else {
            Err(CompensationError::TimestampOutOfWindow {
                requested: time,
                oldest: self.oldest,
                newest: self.now,
            })
        }
    }

    pub fn clamp(&self, time: ServerTime) -> (ServerTime, CompensationFlags) {
        if time < self.oldest {
            (self.oldest, CompensationFlags::OUT_OF_WINDOW)
        } else if time > self.now {
            (self.now, CompensationFlags::FUTURE_TIMESTAMP)
        } else {
            (time, CompensationFlags::empty())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdjustedTime {
    pub time: ServerTime,
    pub latency: SanitizedLatency,
    pub flags: CompensationFlags,
}

#[derive(Debug, Clone)]
pub struct HitVerifier {
    max_window: Duration,
    max_latency: Duration,
}

impl HitVerifier {
    pub fn new(config: &CompensationConfig) -> Self {
        Self {
            max_window: config.max_compensation_window(),
            max_latency: config.max_latency(),
        }
    }

    pub fn window(&self, now: ServerTime) -> CompensationWindow {
        CompensationWindow::new(now, self.max_window)
    }

    /// `clamp(client_time - latency, now - window, now)`, with the latency
    /// itself bounded first.
    pub fn adjusted_time(
        &self,
        now: ServerTime,
        client_time: ServerTime,
        raw_latency_ms: Option<f32>,
    ) -> AdjustedTime {
        let latency = sanitize_latency(raw_latency_ms, self.max_latency);
        let mut flags = CompensationFlags::empty();
        if latency.clamped {
            log::warn!(
                "latency estimate {:?} ms out of bounds, using {:.1} ms",
                raw_latency_ms,
                latency.as_millis_f32()
            );
            flags |= CompensationFlags::LATENCY_CLAMPED;
        }

        let requested = client_time.saturating_sub(latency.latency);
        let window = self.window(now);
        let time = match window.check(requested) {
            Ok(time) => time,
            Err(err) => {
                log::warn!("{}, clamping", err);
                let (time, clamp_flags) = window.clamp(requested);
                flags |= clamp_flags;
                time
            }
        };

        AdjustedTime {
            time,
            latency,
            flags,
        }
    }

    pub fn verify(
        &self,
        registry: &EntityRegistry,
        estimator: &dyn LatencyEstimator,
        now: ServerTime,
        request: &HitRequest,
    ) -> HitReport {
        let raw_latency = estimator.estimated_one_way_latency_ms(request.attacker);
        let adjusted = self.adjusted_time(now, request.client_action_time, raw_latency);
        let mut flags = adjusted.flags;

        let shape_valid = request.shape.is_valid();
        if !shape_valid {
            log::warn!("{} sent degenerate weapon shape {:?}", request.attacker, request.shape);
            flags |= CompensationFlags::INVALID_SHAPE;
        }

        let mut seen = HashSet::with_capacity(request.candidates.len());
        let candidates: Vec<CandidateResult> = request
            .candidates
            .iter()
            .copied()
            .filter(|entity| seen.insert(*entity))
            .map(|entity| CandidateResult {
                entity,
                outcome: self.verify_candidate(
                    registry,
                    &request.shape,
                    shape_valid,
                    entity,
                    adjusted.time,
                ),
            })
            .collect();

        if candidates.iter().any(|c| {
            matches!(&c.outcome, Ok(result) if result.source == RewindSource::LiveFallback)
        }) {
            flags |= CompensationFlags::LIVE_FALLBACK;
        }

        let best = select_best(&candidates);

        log::debug!(
            "{} verified {} candidates at {} (now {}, latency {:.1} ms): best {:?}",
            request.attacker,
            candidates.len(),
            adjusted.time,
            now,
            adjusted.latency.as_millis_f32(),
            best
        );

        HitReport {
            attacker: request.attacker,
            client_action_time: request.client_action_time,
            now,
            rewound_timestamp: adjusted.time,
            latency_ms: adjusted.latency.as_millis_f32(),
            flags,
            candidates,
            best,
        }
    }

    fn verify_candidate(
        &self,
        registry: &EntityRegistry,
        shape: &WeaponShape,
        shape_valid: bool,
        entity: EntityId,
        at: ServerTime,
    ) -> Result<VerificationResult, CompensationError> {
        let state = RewindResolver::resolve(registry, entity, at)?;
        let contact = if shape_valid {
            intersect::test(shape, &TargetVolume::from(&state.transform))
        } else {
            None
        };
        Ok(VerificationResult::from_contact(&state, at, contact))
    }
}

fn select_best(candidates: &[CandidateResult]) -> Option<EntityId> {
    candidates
        .iter()
        .filter_map(|c| match &c.outcome {
            Ok(result) if result.hit => Some((c.entity, result.distance.unwrap_or(f32::MAX))),
            _ => None,
        })
        .min_by(|(a_id, a_dist), (b_id, b_dist)| {
            a_dist.total_cmp(b_dist).then_with(|| a_id.cmp(b_id))
        })
        .map(|(entity, _)| entity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::Transform;
    use crate::latency::{ClientId, FixedLatency};
    use crate::simulation::SnapshotRecorder;
    use glam::{Quat, Vec3};

    fn verifier() -> HitVerifier {
        HitVerifier::new(&CompensationConfig::default())
    }

    #[test]
    fn adjusted_time_subtracts_latency() {
        let adjusted = verifier().adjusted_time(
            ServerTime::from_millis(5_000),
            ServerTime::from_millis(4_900),
            Some(100.0),
        );

        assert_eq!(adjusted.time, ServerTime::from_millis(4_800));
        assert!(adjusted.flags.is_empty());
    }

    #[test]
    fn adjusted_time_clamps_old_claims() {
        let adjusted = verifier().adjusted_time(
            ServerTime::from_millis(5_000),
            ServerTime::from_millis(1_000),
            Some(50.0),
        );

        assert_eq!(adjusted.time, ServerTime::from_millis(4_000));
        assert!(adjusted.flags.contains(CompensationFlags::OUT_OF_WINDOW));
    }

    #[test]
    fn adjusted_time_clamps_future_claims() {
        let adjusted = verifier().adjusted_time(
            ServerTime::from_millis(5_000),
            ServerTime::from_millis(9_000),
            None,
        );

        assert_eq!(adjusted.time, ServerTime::from_millis(5_000));
        assert!(adjusted.flags.contains(CompensationFlags::FUTURE_TIMESTAMP));
    }

    #[test]
    fn absurd_latency_stays_inside_window() {
        let adjusted = verifier().adjusted_time(
            ServerTime::from_millis(5_000),
            ServerTime::from_millis(5_000),
            Some(1.0e9),
        );

        assert_eq!(adjusted.time, ServerTime::from_millis(4_000));
        assert!(adjusted.flags.contains(CompensationFlags::LATENCY_CLAMPED));
        assert!(!adjusted.flags.contains(CompensationFlags::OUT_OF_WINDOW));
    }

    #[test]
    fn window_check_reports_out_of_window() {
        let window = CompensationWindow::new(ServerTime::from_millis(2_000), Duration::from_secs(1));

        assert!(window.check(ServerTime::from_millis(1_500)).is_ok());
        assert!(matches!(
            window.check(ServerTime::from_millis(500)),
            Err(CompensationError::TimestampOutOfWindow { .. })
        ));
    }

    #[test]
    fn degenerate_shape_never_hits() {
        let mut registry = EntityRegistry::new(8);
        registry
            .register(EntityId(1), Transform::sphere(Vec3::ZERO, 1.0))
            .unwrap();
        SnapshotRecorder::new().sweep(&registry, ServerTime::from_millis(10));

        let request = HitRequest::new(
            ClientId(1),
            WeaponShape::ray(Vec3::ZERO, Vec3::ZERO, 10.0),
            ServerTime::from_millis(10),
        )
        .with_candidates([EntityId(1)]);

        let report = verifier().verify(
            &registry,
            &FixedLatency::new(0.0),
            ServerTime::from_millis(10),
            &request,
        );

        assert!(!report.is_hit());
        assert!(report.flags.contains(CompensationFlags::INVALID_SHAPE));
        assert!(matches!(report.result_for(EntityId(1)), Some(Ok(r)) if !r.hit));
    }

    #[test]
    fn collapsed_box_rotation_is_invalid() {
        let mut registry = EntityRegistry::new(8);
        registry
            .register(EntityId(1), Transform::sphere(Vec3::new(500.0, 0.0, 0.0), 0.5))
            .unwrap();
        SnapshotRecorder::new().sweep(&registry, ServerTime::from_millis(10));

        let swing = WeaponShape::Box {
            center: Vec3::ZERO,
            half_extents: Vec3::splat(0.5),
            rotation: Quat::from_xyzw(0.0, 0.0, 0.0, 0.0),
        };
        assert!(!swing.is_valid());

        let request = HitRequest::new(ClientId(1), swing, ServerTime::from_millis(10))
            .with_candidates([EntityId(1)]);
        let report = verifier().verify(
            &registry,
            &FixedLatency::new(0.0),
            ServerTime::from_millis(10),
            &request,
        );

        assert!(!report.is_hit());
        assert!(report.flags.contains(CompensationFlags::INVALID_SHAPE));
    }

    #[test]
    fn duplicate_candidates_verified_once() {
        let mut registry = EntityRegistry::new(8);
        registry
            .register(EntityId(1), Transform::sphere(Vec3::new(5.0, 0.0, 0.0), 1.0))
            .unwrap();

        let request = HitRequest::new(
            ClientId(1),
            WeaponShape::ray(Vec3::ZERO, Vec3::X, 10.0),
            ServerTime::ZERO,
        )
        .with_candidates([EntityId(1), EntityId(1)]);

        let report = verifier().verify(
            &registry,
            &FixedLatency::new(0.0),
            ServerTime::ZERO,
            &request,
        );

        assert_eq!(report.candidates.len(), 1);
        assert_eq!(report.best, Some(EntityId(1)));
        assert!(report.flags.contains(CompensationFlags::LIVE_FALLBACK));
    }
}
