// collide.rs - Narrow phase and manifold reduction
//
// Two modes per pair: OBB SAT over the models' box lists, or voxel-precise
// probing when both bodies carry occupancy data. Either way the contact set
// reduces to a single manifold point: contacts within tolerance of the
// deepest one are averaged and the averaged normal renormalised.

use crate::sat::{obb_contact, Contact, Obb};
use crate::sim::InternalBody;
use crate::snapshot::WorldSlice;
use glam::{IVec3, Vec3};
use strata_core::math::Aabb;

/// Keep contacts within this many metres of the deepest one.
pub(crate) fn reduce_manifold(contacts: &[Contact], tolerance: f32) -> Option<Contact> {
    let deepest = contacts
        .iter()
        .map(|c| c.penetration)
        .fold(f32::NEG_INFINITY, f32::max);
    if !deepest.is_finite() {
        return None;
    }
    let mut point = Vec3::ZERO;
    let mut normal = Vec3::ZERO;
    let mut kept = 0u32;
    for contact in contacts {
        if contact.penetration >= deepest - tolerance {
            point += contact.point;
            normal += contact.normal;
            kept += 1;
        }
    }
    debug_assert!(kept > 0);
    let normal = normal.normalize_or_zero();
    let normal = if normal == Vec3::ZERO {
        // Opposing normals cancelled out; fall back to the deepest contact.
        contacts
            .iter()
            .max_by(|a, b| a.penetration.total_cmp(&b.penetration))
            .map(|c| c.normal)?
    } else {
        normal
    };
    Some(Contact {
        point: point / kept as f32,
        normal,
        penetration: deepest,
    })
}

/// Single contact between two bodies, or None when separated. The returned
/// normal points from `b` toward `a`.
pub(crate) fn pair_contact(a: &InternalBody, b: &InternalBody, tolerance: f32) -> Option<Contact> {
    if a.has_voxels() && b.has_voxels() {
        voxel_pair_contact(a, b, tolerance)
    } else {
        obb_pair_contact(a, b, tolerance)
    }
}

fn obb_pair_contact(a: &InternalBody, b: &InternalBody, tolerance: f32) -> Option<Contact> {
    let mut contacts = Vec::new();
    for box_a in &a.world_boxes {
        let bounds_a = box_a.aabb();
        for box_b in &b.world_boxes {
            if !bounds_a.intersects(&box_b.aabb()) {
                continue;
            }
            if let Some(contact) = obb_contact(box_a, box_b) {
                contacts.push(contact);
            }
        }
    }
    reduce_manifold(&contacts, tolerance)
}

fn voxel_pair_contact(a: &InternalBody, b: &InternalBody, tolerance: f32) -> Option<Contact> {
    // The probe region is the intersection of both world AABBs, expanded by
    // half a voxel so boundary cells still participate.
    let margin = 0.5 * a.model.voxel_size.max(b.model.voxel_size);
    let region = Aabb::new(
        a.aabb.min.max(b.aabb.min),
        a.aabb.max.min(b.aabb.max),
    );
    if region.min.x > region.max.x + margin
        || region.min.y > region.max.y + margin
        || region.min.z > region.max.z + margin
    {
        return None;
    }
    let region = region.expand(margin);

    let mut contacts = Vec::new();
    probe_voxels(a, b, &region, false, &mut contacts);
    // Mirror pass: b's rim voxels against a's grid, normals flipped back
    // into the from-b-toward-a convention.
    probe_voxels(b, a, &region, true, &mut contacts);
    reduce_manifold(&contacts, tolerance)
}

/// Probe every Corner/Edge voxel of `src` against `tgt`'s occupied grid.
fn probe_voxels(
    src: &InternalBody,
    tgt: &InternalBody,
    region: &Aabb,
    flip: bool,
    out: &mut Vec<Contact>,
) {
    let src_vs = src.model.voxel_size;
    let tgt_vs = tgt.model.voxel_size;
    let tgt_inv = tgt.orientation.inverse();
    for voxel in &src.model.voxels {
        if !matches!(
            voxel.category,
            crate::model::VoxelCategory::Edge | crate::model::VoxelCategory::Corner
        ) {
            continue;
        }
        let world_center = src.position + src.orientation * voxel.position;
        if !region.contains_point(world_center) {
            continue;
        }
        // Position in the target's transform-origin grid.
        let grid_pos = (tgt_inv * (world_center - tgt.position) + tgt.model.center_offset) / tgt_vs;
        let base = IVec3::new(
            (grid_pos.x - 0.5).floor() as i32,
            (grid_pos.y - 0.5).floor() as i32,
            (grid_pos.z - 0.5).floor() as i32,
        );
        let probe_box = Obb::new(
            world_center,
            Vec3::splat(src_vs * 0.5),
            src.orientation,
        );
        for dz in 0..2 {
            for dy in 0..2 {
                for dx in 0..2 {
                    let cell = base + IVec3::new(dx, dy, dz);
                    if !tgt.occupied.contains(&cell) {
                        continue;
                    }
                    let cell_center = tgt.position
                        + tgt.orientation
                            * ((cell.as_vec3() + Vec3::splat(0.5)) * tgt_vs
                                - tgt.model.center_offset);
                    let cell_box = Obb::new(cell_center, Vec3::splat(tgt_vs * 0.5), tgt.orientation);
                    let Some(contact) = obb_contact(&probe_box, &cell_box) else {
                        continue;
                    };
                    // A contact whose dominant-axis neighbour in the target
                    // grid is also occupied sits inside solid matter; its
                    // normal is arbitrary, so drop it.
                    if interior_contact(&tgt.occupied, cell, tgt_inv * contact.normal) {
                        continue;
                    }
                    out.push(if flip {
                        Contact {
                            point: contact.point,
                            normal: -contact.normal,
                            penetration: contact.penetration,
                        }
                    } else {
                        contact
                    });
                }
            }
        }
    }
}

/// True when the cell's neighbour along the dominant axis of `local_normal`
/// is occupied (the contact lies inside the solid).
fn interior_contact(occupied: &std::collections::HashSet<IVec3>, cell: IVec3, local_normal: Vec3) -> bool {
    let abs = local_normal.abs();
    let step = if abs.x >= abs.y && abs.x >= abs.z {
        IVec3::new(if local_normal.x >= 0.0 { 1 } else { -1 }, 0, 0)
    } else if abs.y >= abs.z {
        IVec3::new(0, if local_normal.y >= 0.0 { 1 } else { -1 }, 0)
    } else {
        IVec3::new(0, 0, if local_normal.z >= 0.0 { 1 } else { -1 })
    };
    occupied.contains(&(cell + step))
}

/// Contacts between a body and the sampled world slice, reduced to one
/// manifold point; the normal pushes the body out of the world.
pub(crate) fn world_contact(body: &InternalBody, world: &WorldSlice, tolerance: f32) -> Option<Contact> {
    if world.solids.is_empty() {
        return None;
    }
    let vs = world.voxel_size;
    let region = body.aabb.expand(vs * 0.5);
    let min = IVec3::new(
        (region.min.x / vs).floor() as i32,
        (region.min.y / vs).floor() as i32,
        (region.min.z / vs).floor() as i32,
    );
    let max = IVec3::new(
        (region.max.x / vs).floor() as i32,
        (region.max.y / vs).floor() as i32,
        (region.max.z / vs).floor() as i32,
    );

    let mut contacts = Vec::new();
    for z in min.z..=max.z {
        for y in min.y..=max.y {
            for x in min.x..=max.x {
                let cell = IVec3::new(x, y, z);
                if !world.solids.contains(&cell) {
                    continue;
                }
                let cell_box = Obb::new(
                    (cell.as_vec3() + Vec3::splat(0.5)) * vs,
                    Vec3::splat(vs * 0.5),
                    glam::Quat::IDENTITY,
                );
                for body_box in &body.world_boxes {
                    let Some(contact) = obb_contact(body_box, &cell_box) else {
                        continue;
                    };
                    // World grid axes are the world axes; reject contacts
                    // buried behind another solid voxel.
                    if interior_contact(&world.solids, cell, contact.normal) {
                        continue;
                    }
                    contacts.push(contact);
                }
            }
        }
    }
    reduce_manifold(&contacts, tolerance)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reduce_keeps_contacts_near_deepest() {
        let contacts = [
            Contact {
                point: Vec3::new(0.0, 0.0, 0.0),
                normal: Vec3::Y,
                penetration: 0.05,
            },
            Contact {
                point: Vec3::new(1.0, 0.0, 0.0),
                normal: Vec3::Y,
                penetration: 0.045,
            },
            Contact {
                point: Vec3::new(50.0, 0.0, 0.0),
                normal: Vec3::Y,
                penetration: 0.01,
            },
        ];
        let reduced = reduce_manifold(&contacts, 0.01).expect("contacts exist");
        // The shallow outlier is excluded from the average.
        assert!((reduced.point.x - 0.5).abs() < 1e-5);
        assert!((reduced.penetration - 0.05).abs() < 1e-6);
        assert!(reduced.normal.y > 0.99);
    }

    #[test]
    fn reduce_of_empty_set_is_none() {
        assert!(reduce_manifold(&[], 0.01).is_none());
    }
}
