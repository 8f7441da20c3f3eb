use std::f32::consts::TAU;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use backtrack::{CompensationError, EntityId, LagCompensator, ServerTime, Transform};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub count: usize,
    pub orbit_radius: f32,
    /// Radians per second; odd targets orbit the other way.
    pub angular_speed: f32,
    pub radius: f32,
    pub height: f32,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            count: 6,
            orbit_radius: 12.0,
            angular_speed: 0.8,
            radius: 0.6,
            height: 1.0,
        }
    }
}

/// Targets circling the arena centre. Even ones are spheres, odd ones are
/// boxes turned to face along their orbit.
pub struct TargetField {
    config: TargetConfig,
    ids: Vec<EntityId>,
}

impl TargetField {
    pub fn new(config: TargetConfig) -> Self {
        let ids = (0..config.count)
            .map(|index| EntityId(index as u32 + 1))
            .collect();
        Self { config, ids }
    }

    pub fn ids(&self) -> &[EntityId] {
        &self.ids
    }

    pub fn centre(&self) -> Vec3 {
        Vec3::new(0.0, self.config.height, 0.0)
    }

    pub fn transform_at(&self, index: usize, time: ServerTime) -> Transform {
        let phase = index as f32 * TAU / self.config.count.max(1) as f32;
        let direction = if index % 2 == 0 { 1.0 } else { -1.0 };
        let secs = (time.as_millis_f64() / 1000.0) as f32;
        let angle = phase + direction * self.config.angular_speed * secs;

        let position = Vec3::new(
            angle.cos() * self.config.orbit_radius,
            self.config.height,
            angle.sin() * self.config.orbit_radius,
        );

        if index % 2 == 0 {
            Transform::sphere(position, self.config.radius)
        } else {
            let r = self.config.radius;
            Transform::cuboid(position, Vec3::new(r, r * 2.0, r))
                .with_rotation(Quat::from_rotation_y(-angle))
        }
    }

    pub fn spawn(&self, compensator: &LagCompensator) -> Result<(), CompensationError> {
        let now = compensator.now();
        for (index, id) in self.ids.iter().enumerate() {
            compensator.register_entity(*id, self.transform_at(index, now))?;
        }
        log::info!("spawned {} targets", self.ids.len());
        Ok(())
    }

    pub fn advance(&self, compensator: &LagCompensator, time: ServerTime) {
        for (index, id) in self.ids.iter().enumerate() {
            if let Err(err) = compensator.update_transform(*id, self.transform_at(index, time)) {
                log::warn!("target {}: {}", id, err);
            }
        }
    }

    pub fn despawn(&self, compensator: &LagCompensator) {
        for id in &self.ids {
            compensator.unregister_entity(*id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets_stay_on_orbit() {
        let field = TargetField::new(TargetConfig::default());

        for index in 0..field.ids().len() {
            for ms in [0, 250, 1_000, 7_500] {
                let transform = field.transform_at(index, ServerTime::from_millis(ms));
                let flat = Vec3::new(transform.position.x, 0.0, transform.position.z);
                assert!((flat.length() - 12.0).abs() < 1e-3);
                assert_eq!(transform.position.y, 1.0);
            }
        }
    }

    #[test]
    fn ids_start_at_one() {
        let field = TargetField::new(TargetConfig {
            count: 3,
            ..TargetConfig::default()
        });

        assert_eq!(field.ids(), &[EntityId(1), EntityId(2), EntityId(3)]);
    }
}
