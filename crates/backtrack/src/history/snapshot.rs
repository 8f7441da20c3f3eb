use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::simulation::ServerTime;

/// Collision extents of a damageable entity, in its local frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Bounds {
    Sphere { radius: f32 },
    Box { half_extents: Vec3 },
}

impl Bounds {
    pub fn bounding_radius(&self) -> f32 {
        match self {
            Bounds::Sphere { radius } => *radius,
            Bounds::Box { half_extents } => half_extents.length(),
        }
    }

    /// Blends extents of the same kind; mixed kinds snap to the nearer side.
    pub fn lerp(&self, to: &Bounds, t: f32) -> Bounds {
        match (self, to) {
            (Bounds::Sphere { radius: a }, Bounds::Sphere { radius: b }) => Bounds::Sphere {
                radius: a + (b - a) * t,
            },
            (Bounds::Box { half_extents: a }, Bounds::Box { half_extents: b }) => Bounds::Box {
                half_extents: a.lerp(*b, t),
            },
            _ if t < 0.5 => *self,
            _ => *to,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub bounds: Bounds,
}

impl Transform {
    pub fn new(position: Vec3, rotation: Quat, bounds: Bounds) -> Self {
        Self {
            position,
            rotation,
            bounds,
        }
    }

    pub fn sphere(position: Vec3, radius: f32) -> Self {
        Self::new(position, Quat::IDENTITY, Bounds::Sphere { radius })
    }

    pub fn cuboid(position: Vec3, half_extents: Vec3) -> Self {
        Self::new(position, Quat::IDENTITY, Bounds::Box { half_extents })
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation.normalize();
        self
    }

    pub fn interpolate(&self, to: &Transform, t: f32) -> Transform {
        let position = self.position.lerp(to.position, t);

        let rotation = if self.rotation.dot(to.rotation) < 0.0 {
            self.rotation.slerp(-to.rotation, t)
        } else {
            self.rotation.slerp(to.rotation, t)
        };

        Transform {
            position,
            rotation: rotation.normalize(),
            bounds: self.bounds.lerp(&to.bounds, t),
        }
    }

    /// Finite, unit rotation, non-negative extents. The hit tests rely on
    /// all three.
    pub fn is_valid(&self) -> bool {
        let bounds_valid = match self.bounds {
            Bounds::Sphere { radius } => radius.is_finite() && radius >= 0.0,
            Bounds::Box { half_extents } => {
                half_extents.is_finite() && half_extents.cmpge(Vec3::ZERO).all()
            }
        };
        self.position.is_finite() && self.rotation.is_normalized() && bounds_valid
    }
}

/// One recorded tick of an entity. Never mutated once stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    pub timestamp: ServerTime,
    pub transform: Transform,
}

impl Snapshot {
    pub fn new(timestamp: ServerTime, transform: Transform) -> Self {
        Self {
            timestamp,
            transform,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.transform.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolate_position_and_rotation() {
        let from = Transform::sphere(Vec3::ZERO, 0.5);
        let to = Transform::sphere(Vec3::new(10.0, 20.0, 30.0), 1.5)
            .with_rotation(Quat::from_rotation_y(std::f32::consts::FRAC_PI_2));

        let mid = from.interpolate(&to, 0.5);

        assert!((mid.position - Vec3::new(5.0, 10.0, 15.0)).length() < 1e-5);
        let expected = Quat::from_rotation_y(std::f32::consts::FRAC_PI_4);
        assert!(mid.rotation.angle_between(expected) < 1e-3);
        assert_eq!(mid.bounds, Bounds::Sphere { radius: 1.0 });
    }

    #[test]
    fn interpolate_takes_shortest_arc() {
        let a = Quat::from_rotation_y(0.1);
        let b = -Quat::from_rotation_y(0.3);

        let from = Transform::sphere(Vec3::ZERO, 1.0).with_rotation(a);
        let to = Transform::sphere(Vec3::ZERO, 1.0).with_rotation(b);

        let mid = from.interpolate(&to, 0.5);
        assert!(mid.rotation.angle_between(Quat::from_rotation_y(0.2)) < 1e-3);
    }

    #[test]
    fn validity_checks_rotation_and_extents() {
        assert!(Transform::sphere(Vec3::ZERO, 0.5).is_valid());
        assert!(Transform::cuboid(Vec3::ZERO, Vec3::ZERO).is_valid());

        let zero_rotation = Transform::cuboid(Vec3::ZERO, Vec3::ONE)
            .with_rotation(Quat::from_xyzw(0.0, 0.0, 0.0, 0.0));
        assert!(!zero_rotation.is_valid());

        let scaled_rotation = Transform::cuboid(Vec3::ZERO, Vec3::ONE)
            .with_rotation(Quat::from_xyzw(0.0, 0.0, 0.0, 2.0));
        assert!(!scaled_rotation.is_valid());

        assert!(!Transform::sphere(Vec3::ZERO, -0.5).is_valid());
        assert!(!Transform::cuboid(Vec3::ZERO, Vec3::new(1.0, -1.0, 1.0)).is_valid());
        assert!(!Transform::sphere(Vec3::new(f32::NAN, 0.0, 0.0), 0.5).is_valid());
    }

    #[test]
    fn mixed_bounds_snap_to_nearer() {
        let sphere = Bounds::Sphere { radius: 1.0 };
        let cuboid = Bounds::Box {
            half_extents: Vec3::ONE,
        };

        assert_eq!(sphere.lerp(&cuboid, 0.2), sphere);
        assert_eq!(sphere.lerp(&cuboid, 0.8), cuboid);
    }
}
