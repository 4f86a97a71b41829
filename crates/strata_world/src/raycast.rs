// raycast.rs - Grid traversal against the brick map
//
// Amanatides & Woo DDA over world voxel cells. Consumers use this for
// picking and line-of-sight; the physics core has its own narrow phase.

use crate::map::XBrickMap;
use glam::{IVec3, Vec3};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    pub voxel: IVec3,
    pub value: u8,
    /// Unit grid normal of the face the ray entered through; zero when the
    /// ray started inside a solid cell.
    pub normal: IVec3,
    pub distance: f32,
}

/// March `origin + t * direction` through the map, returning the first
/// solid cell within `max_distance`.
pub fn raycast(map: &XBrickMap, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<RayHit> {
    let direction = direction.normalize_or_zero();
    if direction == Vec3::ZERO || max_distance <= 0.0 {
        return None;
    }
    let vs = map.voxel_size();
    let grid_origin = origin / vs;
    let mut cell = IVec3::new(
        grid_origin.x.floor() as i32,
        grid_origin.y.floor() as i32,
        grid_origin.z.floor() as i32,
    );

    let value = map.voxel_at(cell);
    if value != 0 {
        return Some(RayHit {
            voxel: cell,
            value,
            normal: IVec3::ZERO,
            distance: 0.0,
        });
    }

    let mut step = IVec3::ZERO;
    let mut t_max = Vec3::INFINITY;
    let mut t_delta = Vec3::INFINITY;
    for axis in 0..3 {
        let d = direction[axis];
        if d > 0.0 {
            step[axis] = 1;
            t_max[axis] = ((cell[axis] as f32 + 1.0) - grid_origin[axis]) * vs / d;
            t_delta[axis] = vs / d;
        } else if d < 0.0 {
            step[axis] = -1;
            t_max[axis] = (grid_origin[axis] - cell[axis] as f32) * vs / -d;
            t_delta[axis] = vs / -d;
        }
    }

    loop {
        let axis = if t_max.x <= t_max.y && t_max.x <= t_max.z {
            0
        } else if t_max.y <= t_max.z {
            1
        } else {
            2
        };
        let distance = t_max[axis];
        if distance > max_distance {
            return None;
        }
        cell[axis] += step[axis];
        t_max[axis] += t_delta[axis];

        let value = map.voxel_at(cell);
        if value != 0 {
            let mut normal = IVec3::ZERO;
            normal[axis] = -step[axis];
            return Some(RayHit {
                voxel: cell,
                value,
                normal,
                distance,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn straight_down_hits_the_floor() {
        let mut map = XBrickMap::new(1.0);
        for x in -4..4 {
            for z in -4..4 {
                map.set_voxel(IVec3::new(x, 0, z), 1);
            }
        }
        let hit = raycast(
            &map,
            Vec3::new(0.5, 5.0, 0.5),
            Vec3::new(0.0, -1.0, 0.0),
            10.0,
        )
        .expect("floor below");
        assert_eq!(hit.voxel, IVec3::new(0, 0, 0));
        assert_eq!(hit.normal, IVec3::new(0, 1, 0));
        assert!((hit.distance - 4.0).abs() < 1e-4);
    }

    #[test]
    fn misses_within_range_return_none() {
        let mut map = XBrickMap::new(1.0);
        map.set_voxel(IVec3::new(0, 0, 0), 1);
        assert!(raycast(
            &map,
            Vec3::new(0.5, 5.0, 0.5),
            Vec3::new(0.0, 1.0, 0.0),
            100.0
        )
        .is_none());
        assert!(raycast(
            &map,
            Vec3::new(0.5, 5.0, 0.5),
            Vec3::new(0.0, -1.0, 0.0),
            2.0
        )
        .is_none());
    }

    #[test]
    fn diagonal_ray_walks_the_grid() {
        let mut map = XBrickMap::new(1.0);
        map.set_voxel(IVec3::new(3, 3, 0), 9);
        let hit = raycast(
            &map,
            Vec3::new(0.5, 0.5, 0.5),
            Vec3::new(1.0, 1.0, 0.0),
            10.0,
        )
        .expect("solid on the diagonal");
        assert_eq!(hit.voxel, IVec3::new(3, 3, 0));
        assert_eq!(hit.value, 9);
    }

    #[test]
    fn starting_inside_solid_reports_zero_distance() {
        let mut map = XBrickMap::new(0.5);
        map.set_voxel(IVec3::new(2, 2, 2), 5);
        let hit = raycast(
            &map,
            Vec3::new(1.25, 1.25, 1.25),
            Vec3::new(1.0, 0.0, 0.0),
            10.0,
        )
        .expect("inside a solid cell");
        assert_eq!(hit.distance, 0.0);
        assert_eq!(hit.normal, IVec3::ZERO);
    }

    #[test]
    fn zero_direction_is_rejected() {
        let map = XBrickMap::new(1.0);
        assert!(raycast(&map, Vec3::ZERO, Vec3::ZERO, 10.0).is_none());
    }
}
