use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::history::{Bounds, Transform};

/// Attack geometry, positioned from the attacker's current authoritative
/// state. Only targets are rewound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WeaponShape {
    Ray {
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
    },
    Box {
        center: Vec3,
        half_extents: Vec3,
        rotation: Quat,
    },
    Radius {
        center: Vec3,
        radius: f32,
    },
}

impl WeaponShape {
    pub fn ray(origin: Vec3, direction: Vec3, max_distance: f32) -> Self {
        WeaponShape::Ray {
            origin,
            direction: direction.normalize_or_zero(),
            max_distance,
        }
    }

    pub fn oriented_box(center: Vec3, half_extents: Vec3, rotation: Quat) -> Self {
        WeaponShape::Box {
            center,
            half_extents,
            rotation: rotation.normalize(),
        }
    }

    pub fn radius(center: Vec3, radius: f32) -> Self {
        WeaponShape::Radius { center, radius }
    }

    pub fn is_valid(&self) -> bool {
        match self {
            WeaponShape::Ray {
                origin,
                direction,
                max_distance,
            } => {
                origin.is_finite()
                    && direction.is_finite()
                    && (direction.length_squared() - 1.0).abs() < 1e-3
                    && *max_distance > 0.0
            }
            WeaponShape::Box {
                center,
                half_extents,
                rotation,
            } => {
                center.is_finite()
                    && rotation.is_normalized()
                    && half_extents.is_finite()
                    && half_extents.cmpge(Vec3::ZERO).all()
            }
            WeaponShape::Radius { center, radius } => {
                center.is_finite() && radius.is_finite() && *radius >= 0.0
            }
        }
    }
}

/// A rewound target's collision volume in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TargetVolume {
    Sphere {
        center: Vec3,
        radius: f32,
    },
    Box {
        center: Vec3,
        half_extents: Vec3,
        rotation: Quat,
    },
}

impl TargetVolume {
    pub fn center(&self) -> Vec3 {
        match self {
            TargetVolume::Sphere { center, .. } | TargetVolume::Box { center, .. } => *center,
        }
    }

    pub fn closest_point(&self, point: Vec3) -> Vec3 {
        match *self {
            TargetVolume::Sphere { center, radius } => {
                let offset = point - center;
                if offset.length_squared() <= radius * radius {
                    point
                } else {
                    center + offset.normalize_or_zero() * radius
                }
            }
            TargetVolume::Box {
                center,
                half_extents,
                rotation,
            } => {
                let local = rotation.inverse() * (point - center);
                center + rotation * local.clamp(-half_extents, half_extents)
            }
        }
    }
}

impl From<&Transform> for TargetVolume {
    fn from(transform: &Transform) -> Self {
        match transform.bounds {
            Bounds::Sphere { radius } => TargetVolume::Sphere {
                center: transform.position,
                radius,
            },
            Bounds::Box { half_extents } => TargetVolume::Box {
                center: transform.position,
                half_extents,
                rotation: transform.rotation,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ray_constructor_normalizes() {
        let shape = WeaponShape::ray(Vec3::ZERO, Vec3::new(0.0, 0.0, 5.0), 100.0);
        assert!(shape.is_valid());

        let degenerate = WeaponShape::ray(Vec3::ZERO, Vec3::ZERO, 100.0);
        assert!(!degenerate.is_valid());
    }

    #[test]
    fn closest_point_on_rotated_box() {
        let volume = TargetVolume::Box {
            center: Vec3::ZERO,
            half_extents: Vec3::new(1.0, 1.0, 1.0),
            rotation: Quat::from_rotation_y(std::f32::consts::FRAC_PI_4),
        };

        let closest = volume.closest_point(Vec3::new(10.0, 0.0, 0.0));
        assert!((closest.length() - std::f32::consts::SQRT_2).abs() < 1e-4);
    }
}
