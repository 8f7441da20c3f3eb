use crate::error::CompensationError;
use crate::history::{Bracket, Clamp, Transform};
use crate::registry::{EntityId, EntityRegistry};
use crate::simulation::ServerTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewindSource {
    Exact,
    Interpolated,
    ClampedOldest,
    ClampedNewest,
    /// Nothing recorded yet; the live transform stands in.
    LiveFallback,
}

/// An entity's reconstructed spatial state at `timestamp`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RewoundState {
    pub entity: EntityId,
    pub timestamp: ServerTime,
    pub transform: Transform,
    pub source: RewindSource,
}

pub struct RewindResolver;

impl RewindResolver {
    pub fn resolve(
        registry: &EntityRegistry,
        entity: EntityId,
        target: ServerTime,
    ) -> Result<RewoundState, CompensationError> {
        let track = registry
            .get(entity)
            .ok_or(CompensationError::EntityNotCompensable(entity))?;

        // copy out under the lock, interpolate after releasing it
        let (bracket, live) = {
            let track = track.read();
            (track.history().query(target), *track.live())
        };

        match bracket.ok_or(CompensationError::BufferUnderflow(entity)) {
            Ok(bracket) => Ok(Self::from_bracket(entity, &bracket, target)),
            Err(err) => {
                log::debug!("{}, using live transform", err);
                Ok(RewoundState {
                    entity,
                    timestamp: target,
                    transform: live,
                    source: RewindSource::LiveFallback,
                })
            }
        }
    }

    pub fn from_bracket(entity: EntityId, bracket: &Bracket, target: ServerTime) -> RewoundState {
        let before = &bracket.before;
        let after = &bracket.after;

        if bracket.is_single() {
            let source = match bracket.clamp {
                Clamp::None => RewindSource::Exact,
                Clamp::BeforeOldest => RewindSource::ClampedOldest,
                Clamp::AfterNewest => RewindSource::ClampedNewest,
            };
            return RewoundState {
                entity,
                timestamp: before.timestamp,
                transform: before.transform,
                source,
            };
        }

        let t = target
            .fraction_between(before.timestamp, after.timestamp)
            .clamp(0.0, 1.0);

        RewoundState {
            entity,
            timestamp: target,
            transform: before.transform.interpolate(&after.transform, t),
            source: RewindSource::Interpolated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{Bounds, Snapshot};
    use crate::simulation::SnapshotRecorder;
    use glam::{Quat, Vec3};

    fn registry_with_track(points: &[(u64, f32)]) -> EntityRegistry {
        let mut registry = EntityRegistry::new(32);
        let id = EntityId(1);
        registry
            .register(id, Transform::sphere(Vec3::ZERO, 0.5))
            .unwrap();

        let mut recorder = SnapshotRecorder::new();
        for &(ms, x) in points {
            registry
                .update_transform(id, Transform::sphere(Vec3::new(x, 0.0, 0.0), 0.5))
                .unwrap();
            recorder.sweep(&registry, ServerTime::from_millis(ms));
        }
        registry
    }

    #[test]
    fn interpolates_between_ticks() {
        let registry = registry_with_track(&[(0, 0.0), (100, 10.0)]);

        let state =
            RewindResolver::resolve(&registry, EntityId(1), ServerTime::from_millis(50)).unwrap();

        assert_eq!(state.source, RewindSource::Interpolated);
        assert!((state.transform.position - Vec3::new(5.0, 0.0, 0.0)).length() < 1e-5);
        assert_eq!(state.timestamp, ServerTime::from_millis(50));
    }

    #[test]
    fn exact_match_is_verbatim() {
        let registry = registry_with_track(&[(0, 0.0), (100, 10.123_457), (200, 20.0)]);

        let state =
            RewindResolver::resolve(&registry, EntityId(1), ServerTime::from_millis(100)).unwrap();

        assert_eq!(state.source, RewindSource::Exact);
        assert_eq!(state.transform.position.x, 10.123_457);
    }

    #[test]
    fn clamps_to_retained_range() {
        let registry = registry_with_track(&[(100, 1.0), (200, 2.0)]);

        let early =
            RewindResolver::resolve(&registry, EntityId(1), ServerTime::from_millis(10)).unwrap();
        assert_eq!(early.source, RewindSource::ClampedOldest);
        assert_eq!(early.transform.position.x, 1.0);
        assert_eq!(early.timestamp, ServerTime::from_millis(100));

        let late =
            RewindResolver::resolve(&registry, EntityId(1), ServerTime::from_millis(900)).unwrap();
        assert_eq!(late.source, RewindSource::ClampedNewest);
        assert_eq!(late.transform.position.x, 2.0);
    }

    #[test]
    fn unknown_entity_not_compensable() {
        let registry = EntityRegistry::new(8);
        assert_eq!(
            RewindResolver::resolve(&registry, EntityId(9), ServerTime::ZERO),
            Err(CompensationError::EntityNotCompensable(EntityId(9)))
        );
    }

    #[test]
    fn empty_history_falls_back_to_live() {
        let mut registry = EntityRegistry::new(8);
        registry
            .register(EntityId(4), Transform::sphere(Vec3::new(3.0, 0.0, 0.0), 0.5))
            .unwrap();

        let state =
            RewindResolver::resolve(&registry, EntityId(4), ServerTime::from_millis(5)).unwrap();
        assert_eq!(state.source, RewindSource::LiveFallback);
        assert_eq!(state.transform.position.x, 3.0);
    }

    #[test]
    fn degenerate_bracket_returns_before() {
        let snapshot = Snapshot::new(
            ServerTime::from_millis(10),
            Transform::new(
                Vec3::ONE,
                Quat::from_rotation_x(0.3),
                Bounds::Box {
                    half_extents: Vec3::splat(0.5),
                },
            ),
        );
        let bracket = Bracket {
            before: snapshot,
            after: snapshot,
            clamp: Clamp::None,
        };

        let state =
            RewindResolver::from_bracket(EntityId(1), &bracket, ServerTime::from_millis(10));
        assert_eq!(state.transform, snapshot.transform);
        assert_eq!(state.source, RewindSource::Exact);
    }
}
