use glam::{Quat, Vec3};

use super::shape::{TargetVolume, WeaponShape};

const PARALLEL_EPSILON: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub point: Vec3,
    /// Distance along the ray for hitscan, centre distance for volumes.
    pub distance: f32,
}

pub fn test(shape: &WeaponShape, target: &TargetVolume) -> Option<Contact> {
    match *shape {
        WeaponShape::Ray {
            origin,
            direction,
            max_distance,
        } => {
            let toi = match *target {
                TargetVolume::Sphere { center, radius } => {
                    ray_sphere(origin, direction, center, radius)?
                }
                TargetVolume::Box {
                    center,
                    half_extents,
                    rotation,
                } => ray_obb(origin, direction, center, half_extents, rotation)?,
            };
            (toi <= max_distance).then(|| Contact {
                point: origin + direction * toi,
                distance: toi,
            })
        }
        WeaponShape::Radius { center, radius } => {
            let overlaps = match *target {
                TargetVolume::Sphere {
                    center: target_center,
                    radius: target_radius,
                } => sphere_sphere(center, radius, target_center, target_radius),
                TargetVolume::Box {
                    center: target_center,
                    half_extents,
                    rotation,
                } => sphere_obb(center, radius, target_center, half_extents, rotation),
            };
            overlaps.then(|| volume_contact(center, target))
        }
        WeaponShape::Box {
            center,
            half_extents,
            rotation,
        } => {
            let overlaps = match *target {
                TargetVolume::Sphere {
                    center: target_center,
                    radius,
                } => sphere_obb(target_center, radius, center, half_extents, rotation),
                TargetVolume::Box {
                    center: target_center,
                    half_extents: target_half,
                    rotation: target_rotation,
                } => obb_obb(
                    center,
                    half_extents,
                    rotation,
                    target_center,
                    target_half,
                    target_rotation,
                ),
            };
            overlaps.then(|| volume_contact(center, target))
        }
    }
}

fn volume_contact(anchor: Vec3, target: &TargetVolume) -> Contact {
    Contact {
        point: target.closest_point(anchor),
        distance: anchor.distance(target.center()),
    }
}

/// `direction` must be normalized. An origin inside the sphere hits at 0.
pub fn ray_sphere(origin: Vec3, direction: Vec3, center: Vec3, radius: f32) -> Option<f32> {
    let m = origin - center;
    let c = m.length_squared() - radius * radius;
    if c <= 0.0 {
        return Some(0.0);
    }

    let b = m.dot(direction);
    if b > 0.0 {
        return None;
    }

    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return None;
    }

    Some(-b - discriminant.sqrt())
}

/// Slab test in the box's local frame.
pub fn ray_obb(
    origin: Vec3,
    direction: Vec3,
    center: Vec3,
    half_extents: Vec3,
    rotation: Quat,
) -> Option<f32> {
    let inverse = rotation.inverse();
    let local_origin = inverse * (origin - center);
    let local_direction = inverse * direction;

    let mut t_min = 0.0f32;
    let mut t_max = f32::INFINITY;

    for axis in 0..3 {
        let o = local_origin[axis];
        let d = local_direction[axis];
        let h = half_extents[axis];

        if d.abs() < PARALLEL_EPSILON {
            if o < -h || o > h {
                return None;
            }
            continue;
        }

        let inv = 1.0 / d;
        let mut t1 = (-h - o) * inv;
        let mut t2 = (h - o) * inv;
        if t1 > t2 {
            std::mem::swap(&mut t1, &mut t2);
        }

        t_min = t_min.max(t1);
        t_max = t_max.min(t2);
        if t_min > t_max {
            return None;
        }
    }

    Some(t_min)
}

pub fn sphere_sphere(a: Vec3, a_radius: f32, b: Vec3, b_radius: f32) -> bool {
    let reach = a_radius + b_radius;
    a.distance_squared(b) <= reach * reach
}

pub fn sphere_obb(
    sphere_center: Vec3,
    radius: f32,
    box_center: Vec3,
    half_extents: Vec3,
    rotation: Quat,
) -> bool {
    let local = rotation.inverse() * (sphere_center - box_center);
    let closest = local.clamp(-half_extents, half_extents);
    local.distance_squared(closest) <= radius * radius
}

/// Separating axis test over the 15 candidate axes of two oriented boxes.
pub fn obb_obb(
    a_center: Vec3,
    a_half: Vec3,
    a_rotation: Quat,
    b_center: Vec3,
    b_half: Vec3,
    b_rotation: Quat,
) -> bool {
    let a_axes = [a_rotation * Vec3::X, a_rotation * Vec3::Y, a_rotation * Vec3::Z];
    let b_axes = [b_rotation * Vec3::X, b_rotation * Vec3::Y, b_rotation * Vec3::Z];
    let offset = b_center - a_center;

    let separated_on = |axis: Vec3| -> bool {
        let length_squared = axis.length_squared();
        if length_squared < PARALLEL_EPSILON {
            return false;
        }
        let axis = axis / length_squared.sqrt();

        let project = |axes: &[Vec3; 3], half: Vec3| -> f32 {
            half.x * axes[0].dot(axis).abs()
                + half.y * axes[1].dot(axis).abs()
                + half.z * axes[2].dot(axis).abs()
        };

        offset.dot(axis).abs() > project(&a_axes, a_half) + project(&b_axes, b_half)
    };

    if a_axes.iter().chain(b_axes.iter()).any(|&axis| separated_on(axis)) {
        return false;
    }

    for a in a_axes {
        for b in b_axes {
            if separated_on(a.cross(b)) {
                return false;
            }
        }
    }

    true
}
