use std::collections::HashMap;

use parking_lot::RwLock;

use crate::error::CompensationError;
use crate::history::{HistoryBuffer, Transform};

use super::entity::{EntityId, EntityTrack};

#[derive(Debug)]
struct Slot {
    id: EntityId,
    track: RwLock<EntityTrack>,
}

/// Arena of entity tracks addressed by stable [`EntityId`].
///
/// Slots are reused after despawn and their history allocations are kept, so
/// the per-tick sweep walks one contiguous vector without reallocating.
#[derive(Debug)]
pub struct EntityRegistry {
    slots: Vec<Option<Slot>>,
    index: HashMap<EntityId, usize>,
    free: Vec<usize>,
    spare: Vec<HistoryBuffer>,
    history_capacity: usize,
}

impl EntityRegistry {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            slots: Vec::new(),
            index: HashMap::new(),
            free: Vec::new(),
            spare: Vec::new(),
            history_capacity: history_capacity.max(HistoryBuffer::MIN_CAPACITY),
        }
    }

    pub fn history_capacity(&self) -> usize {
        self.history_capacity
    }

    pub fn register(
        &mut self,
        id: EntityId,
        initial: Transform,
    ) -> Result<(), CompensationError> {
        if self.index.contains_key(&id) {
            return Err(CompensationError::AlreadyRegistered(id));
        }
        if !initial.is_valid() {
            return Err(CompensationError::InvalidTransform(id));
        }

        let history = self
            .spare
            .pop()
            .unwrap_or_else(|| HistoryBuffer::new(self.history_capacity));
        let slot = Slot {
            id,
            track: RwLock::new(EntityTrack::new(initial, history)),
        };

        let slot_index = match self.free.pop() {
            Some(free_index) => {
                self.slots[free_index] = Some(slot);
                free_index
            }
            None => {
                self.slots.push(Some(slot));
                self.slots.len() - 1
            }
        };
        self.index.insert(id, slot_index);

        Ok(())
    }

    pub fn unregister(&mut self, id: EntityId) -> bool {
        let Some(slot_index) = self.index.remove(&id) else {
            return false;
        };

        if let Some(slot) = self.slots[slot_index].take() {
            let mut history = slot.track.into_inner().into_history();
            history.clear();
            if self.spare.len() < self.slots.len() {
                self.spare.push(history);
            }
        }
        self.free.push(slot_index);

        true
    }

    pub fn get(&self, id: EntityId) -> Option<&RwLock<EntityTrack>> {
        let slot_index = *self.index.get(&id)?;
        self.slots[slot_index].as_ref().map(|slot| &slot.track)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn update_transform(
        &self,
        id: EntityId,
        transform: Transform,
    ) -> Result<(), CompensationError> {
        if !transform.is_valid() {
            return Err(CompensationError::InvalidTransform(id));
        }
        let track = self
            .get(id)
            .ok_or(CompensationError::EntityNotCompensable(id))?;
        track.write().set_live(transform);
        Ok(())
    }

    pub fn live_transform(&self, id: EntityId) -> Option<Transform> {
        self.get(id).map(|track| *track.read().live())
    }

    /// Tracks in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &RwLock<EntityTrack>)> {
        self.slots
            .iter()
            .filter_map(|slot| slot.as_ref().map(|slot| (slot.id, &slot.track)))
    }

    pub fn ids(&self) -> Vec<EntityId> {
        self.iter().map(|(id, _)| id).collect()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::ServerTime;
    use glam::{Quat, Vec3};

    fn transform(x: f32) -> Transform {
        Transform::sphere(Vec3::new(x, 0.0, 0.0), 0.5)
    }

    #[test]
    fn register_and_lookup() {
        let mut registry = EntityRegistry::new(16);
        registry.register(EntityId(7), transform(1.0)).unwrap();

        assert!(registry.contains(EntityId(7)));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.live_transform(EntityId(7)).unwrap().position.x, 1.0);
        assert!(registry.get(EntityId(8)).is_none());
    }

    #[test]
    fn duplicate_registration_rejected() {
        let mut registry = EntityRegistry::new(16);
        registry.register(EntityId(1), transform(0.0)).unwrap();

        assert_eq!(
            registry.register(EntityId(1), transform(0.0)),
            Err(CompensationError::AlreadyRegistered(EntityId(1)))
        );
    }

    #[test]
    fn non_finite_transform_rejected() {
        let mut registry = EntityRegistry::new(16);
        assert_eq!(
            registry.register(EntityId(1), transform(f32::NAN)),
            Err(CompensationError::InvalidTransform(EntityId(1)))
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn degenerate_box_rejected() {
        let mut registry = EntityRegistry::new(16);
        let collapsed = Transform::cuboid(Vec3::new(0.0, 300.0, 0.0), Vec3::ONE)
            .with_rotation(Quat::from_xyzw(0.0, 0.0, 0.0, 0.0));

        assert_eq!(
            registry.register(EntityId(1), collapsed),
            Err(CompensationError::InvalidTransform(EntityId(1)))
        );
        assert_eq!(
            registry.register(EntityId(1), Transform::cuboid(Vec3::ZERO, Vec3::splat(-1.0))),
            Err(CompensationError::InvalidTransform(EntityId(1)))
        );

        registry.register(EntityId(2), transform(0.0)).unwrap();
        assert_eq!(
            registry.update_transform(EntityId(2), collapsed),
            Err(CompensationError::InvalidTransform(EntityId(2)))
        );
        assert_eq!(
            registry.update_transform(EntityId(2), Transform::sphere(Vec3::ZERO, -2.0)),
            Err(CompensationError::InvalidTransform(EntityId(2)))
        );
        assert_eq!(registry.live_transform(EntityId(2)), Some(transform(0.0)));
    }

    #[test]
    fn slot_reuse_starts_with_empty_history() {
        let mut registry = EntityRegistry::new(16);
        registry.register(EntityId(1), transform(0.0)).unwrap();
        registry
            .get(EntityId(1))
            .unwrap()
            .write()
            .record(ServerTime::from_millis(10))
            .unwrap();

        assert!(registry.unregister(EntityId(1)));
        assert!(!registry.unregister(EntityId(1)));

        registry.register(EntityId(2), transform(5.0)).unwrap();
        let track = registry.get(EntityId(2)).unwrap().read();
        assert!(track.history().is_empty());
        assert_eq!(track.history().capacity(), 16);
        assert_eq!(registry.ids(), vec![EntityId(2)]);
    }

    #[test]
    fn update_unknown_entity() {
        let registry = EntityRegistry::new(16);
        assert_eq!(
            registry.update_transform(EntityId(3), transform(0.0)),
            Err(CompensationError::EntityNotCompensable(EntityId(3)))
        );
    }
}
