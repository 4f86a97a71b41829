// sat.rs - Separating-axis test for oriented boxes
//
// 15 candidate axes: the three face normals of each box plus the nine
// cross products; near-parallel edge pairs produce degenerate crosses and
// are skipped. The minimum-overlap axis is the contact normal, flipped so
// it points from `b` toward `a`; the contact point averages the corners of
// either box contained in the other.

use glam::{Quat, Vec3};
use strata_core::math::Aabb;

const CROSS_EPSILON: f32 = 1e-6;
const CONTAINMENT_EPSILON: f32 = 1e-4;

/// Oriented box in world space.
#[derive(Clone, Copy, Debug)]
pub struct Obb {
    pub center: Vec3,
    pub half: Vec3,
    pub orientation: Quat,
}

impl Obb {
    pub fn new(center: Vec3, half: Vec3, orientation: Quat) -> Self {
        Self {
            center,
            half,
            orientation,
        }
    }

    pub fn axes(&self) -> [Vec3; 3] {
        [
            self.orientation * Vec3::X,
            self.orientation * Vec3::Y,
            self.orientation * Vec3::Z,
        ]
    }

    /// Projection radius onto a unit axis.
    fn radius_along(&self, axes: &[Vec3; 3], axis: Vec3) -> f32 {
        self.half.x * axes[0].dot(axis).abs()
            + self.half.y * axes[1].dot(axis).abs()
            + self.half.z * axes[2].dot(axis).abs()
    }

    /// World AABB enclosing the box.
    pub fn aabb(&self) -> Aabb {
        let axes = self.axes();
        let extent = Vec3::new(
            self.radius_along(&axes, Vec3::X),
            self.radius_along(&axes, Vec3::Y),
            self.radius_along(&axes, Vec3::Z),
        );
        Aabb::new(self.center - extent, self.center + extent)
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let [x, y, z] = self.axes();
        let (hx, hy, hz) = (self.half.x, self.half.y, self.half.z);
        let mut corners = [Vec3::ZERO; 8];
        let mut i = 0;
        for sx in [-1.0f32, 1.0] {
            for sy in [-1.0f32, 1.0] {
                for sz in [-1.0f32, 1.0] {
                    corners[i] = self.center + x * (sx * hx) + y * (sy * hy) + z * (sz * hz);
                    i += 1;
                }
            }
        }
        corners
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        let local = self.orientation.inverse() * (point - self.center);
        local.x.abs() <= self.half.x + CONTAINMENT_EPSILON
            && local.y.abs() <= self.half.y + CONTAINMENT_EPSILON
            && local.z.abs() <= self.half.z + CONTAINMENT_EPSILON
    }
}

/// A single contact between two bodies: `normal` points from the second
/// body toward the first, `penetration` along it.
#[derive(Clone, Copy, Debug)]
pub struct Contact {
    pub point: Vec3,
    pub normal: Vec3,
    pub penetration: f32,
}

/// SAT over the 15 axes; Some(contact) when every axis overlaps.
pub fn obb_contact(a: &Obb, b: &Obb) -> Option<Contact> {
    let a_axes = a.axes();
    let b_axes = b.axes();
    let delta = b.center - a.center;

    let mut min_overlap = f32::INFINITY;
    let mut min_axis = Vec3::Y;

    let mut test_axis = |axis: Vec3| -> bool {
        let length_sq = axis.length_squared();
        if length_sq < CROSS_EPSILON {
            // Degenerate cross product of near-parallel edges.
            return true;
        }
        let axis = axis / length_sq.sqrt();
        let distance = delta.dot(axis);
        let overlap = a.radius_along(&a_axes, axis) + b.radius_along(&b_axes, axis) - distance.abs();
        if overlap < 0.0 {
            return false;
        }
        if overlap < min_overlap {
            min_overlap = overlap;
            // Flip so the normal pushes `a` away from `b`.
            min_axis = if distance > 0.0 { -axis } else { axis };
        }
        true
    };

    for axis in a_axes {
        if !test_axis(axis) {
            return None;
        }
    }
    for axis in b_axes {
        if !test_axis(axis) {
            return None;
        }
    }
    for a_axis in a_axes {
        for b_axis in b_axes {
            if !test_axis(a_axis.cross(b_axis)) {
                return None;
            }
        }
    }

    // Contact point: average of the corners each box buries in the other.
    let mut sum = Vec3::ZERO;
    let mut count = 0u32;
    for corner in a.corners() {
        if b.contains_point(corner) {
            sum += corner;
            count += 1;
        }
    }
    for corner in b.corners() {
        if a.contains_point(corner) {
            sum += corner;
            count += 1;
        }
    }
    let point = if count > 0 {
        sum / count as f32
    } else {
        (a.center + b.center) * 0.5
    };

    Some(Contact {
        point,
        normal: min_axis,
        penetration: min_overlap,
    })
}

/// Slab test: distance along the ray to the box surface, None on a miss.
/// `direction` must be normalized; hits behind the origin are misses.
pub fn ray_obb(origin: Vec3, direction: Vec3, obb: &Obb) -> Option<f32> {
    let inverse = obb.orientation.inverse();
    let local_origin = inverse * (origin - obb.center);
    let local_direction = inverse * direction;

    let mut t_enter = f32::NEG_INFINITY;
    let mut t_exit = f32::INFINITY;
    for axis in 0..3 {
        let o = local_origin[axis];
        let d = local_direction[axis];
        let h = obb.half[axis];
        if d.abs() < 1e-8 {
            if o.abs() > h {
                return None;
            }
            continue;
        }
        let t1 = (-h - o) / d;
        let t2 = (h - o) / d;
        let (near, far) = if t1 < t2 { (t1, t2) } else { (t2, t1) };
        t_enter = t_enter.max(near);
        t_exit = t_exit.min(far);
        if t_enter > t_exit {
            return None;
        }
    }
    if t_exit < 0.0 {
        return None;
    }
    Some(t_enter.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis_aligned(center: Vec3, half: Vec3) -> Obb {
        Obb::new(center, half, Quat::IDENTITY)
    }

    #[test]
    fn separated_boxes_produce_no_contact() {
        let a = axis_aligned(Vec3::ZERO, Vec3::splat(0.5));
        let b = axis_aligned(Vec3::new(2.0, 0.0, 0.0), Vec3::splat(0.5));
        assert!(obb_contact(&a, &b).is_none());
    }

    #[test]
    fn overlap_reports_minimum_axis_and_direction() {
        let a = axis_aligned(Vec3::new(0.0, 0.9, 0.0), Vec3::splat(0.5));
        let b = axis_aligned(Vec3::ZERO, Vec3::splat(0.5));
        let contact = obb_contact(&a, &b).expect("boxes overlap");
        // Overlap is smallest along Y; the normal pushes `a` up, away
        // from `b`.
        assert!((contact.penetration - 0.1).abs() < 1e-5);
        assert!(contact.normal.y > 0.99);
    }

    #[test]
    fn touching_faces_count_as_contact() {
        let a = axis_aligned(Vec3::new(0.0, 1.0, 0.0), Vec3::splat(0.5));
        let b = axis_aligned(Vec3::ZERO, Vec3::splat(0.5));
        let contact = obb_contact(&a, &b).expect("touching boxes make contact");
        assert!(contact.penetration.abs() < 1e-5);
    }

    #[test]
    fn rotated_box_needs_cross_axes() {
        // A box rotated 45 degrees about Y sitting diagonally near a unit
        // box; face axes alone would miss the separation.
        let a = axis_aligned(Vec3::ZERO, Vec3::splat(0.5));
        let rotated = Obb::new(
            Vec3::new(1.35, 0.0, 0.0),
            Vec3::splat(0.5),
            Quat::from_rotation_y(std::f32::consts::FRAC_PI_4),
        );
        // Corner-to-face distance: the rotated box's nearest corner reaches
        // 1.35 - 0.707 ≈ 0.64 > 0.5, so they are separated.
        assert!(obb_contact(&a, &rotated).is_none());
        let closer = Obb::new(
            Vec3::new(1.1, 0.0, 0.0),
            Vec3::splat(0.5),
            Quat::from_rotation_y(std::f32::consts::FRAC_PI_4),
        );
        assert!(obb_contact(&a, &closer).is_some());
    }

    #[test]
    fn ray_hits_the_near_face() {
        let obb = axis_aligned(Vec3::new(0.0, 0.0, 5.0), Vec3::splat(0.5));
        let t = ray_obb(Vec3::ZERO, Vec3::Z, &obb).expect("box ahead of the ray");
        assert!((t - 4.5).abs() < 1e-5);
        assert!(ray_obb(Vec3::ZERO, -Vec3::Z, &obb).is_none());
    }

    #[test]
    fn ray_from_inside_reports_zero() {
        let obb = axis_aligned(Vec3::ZERO, Vec3::ONE);
        assert_eq!(ray_obb(Vec3::ZERO, Vec3::X, &obb), Some(0.0));
    }

    #[test]
    fn ray_respects_rotation() {
        let obb = Obb::new(
            Vec3::new(0.0, 0.0, 5.0),
            Vec3::new(2.0, 0.1, 0.1),
            Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
        );
        // Rotated about Y, the long axis lies along Z: the near face is at
        // z = 3 instead of z = 4.9.
        let t = ray_obb(Vec3::ZERO, Vec3::Z, &obb).expect("rotated box ahead");
        assert!((t - 3.0).abs() < 1e-3);
    }

    #[test]
    fn world_aabb_covers_rotation() {
        let obb = Obb::new(
            Vec3::ZERO,
            Vec3::new(1.0, 0.1, 0.1),
            Quat::from_rotation_z(std::f32::consts::FRAC_PI_4),
        );
        let aabb = obb.aabb();
        // The long axis leans into Y, so the AABB must be taller than the
        // unrotated half extent.
        assert!(aabb.max.y > 0.7);
        assert!(aabb.max.x > 0.7);
    }
}
