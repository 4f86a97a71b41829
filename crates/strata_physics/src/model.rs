// model.rs - Voxelised collision models
//
// A model is a list of oriented boxes in the body-local frame plus, for the
// precise collider, the occupied voxel cells categorized by how exposed
// they are. Positions are relative to the physics origin; `center_offset`
// points from the transform origin to the physics origin.

use glam::{IVec3, Vec3};
use std::collections::HashSet;

/// One box of a model, in the body-local frame of the physics origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModelBox {
    pub half_extents: Vec3,
    pub offset: Vec3,
}

/// How exposed a voxel cell is; only `Edge` and `Corner` cells probe the
/// other body in the precise narrow phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoxelCategory {
    Internal,
    Face,
    Edge,
    Corner,
}

/// One occupied voxel cell; `position` is the cell centre relative to the
/// physics origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModelVoxel {
    pub position: Vec3,
    pub category: VoxelCategory,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PhysicsModel {
    pub boxes: Vec<ModelBox>,
    /// Transform origin -> physics origin, in the unrotated body frame.
    pub center_offset: Vec3,
    pub voxel_size: f32,
    /// Empty for box-only models; the pair then collides in OBB mode.
    pub voxels: Vec<ModelVoxel>,
}

impl PhysicsModel {
    /// A single box centred on the transform origin; OBB collision mode.
    pub fn single_box(half_extents: Vec3) -> Self {
        Self {
            boxes: vec![ModelBox {
                half_extents,
                offset: Vec3::ZERO,
            }],
            center_offset: Vec3::ZERO,
            voxel_size: half_extents.min_element().max(f32::EPSILON) * 2.0,
            voxels: Vec::new(),
        }
    }

    /// Build a precise model from occupied grid cells. Cell `c` spans
    /// `[c*voxel_size, (c+1)*voxel_size)` relative to the transform origin.
    /// The physics origin is the centre of the occupied bounding box; one
    /// bounding box serves as the broad shape.
    pub fn from_voxels(voxel_size: f32, cells: &[IVec3]) -> Self {
        assert!(voxel_size > 0.0, "voxel size must be positive");
        if cells.is_empty() {
            return Self {
                boxes: Vec::new(),
                center_offset: Vec3::ZERO,
                voxel_size,
                voxels: Vec::new(),
            };
        }
        let occupied: HashSet<IVec3> = cells.iter().copied().collect();
        let mut min = cells[0];
        let mut max = cells[0];
        for &c in cells {
            min = min.min(c);
            max = max.max(c);
        }
        let center_offset = (min.as_vec3() + max.as_vec3() + Vec3::ONE) * 0.5 * voxel_size;
        let half_extents = (max - min + IVec3::ONE).as_vec3() * 0.5 * voxel_size;

        let mut voxels = Vec::with_capacity(occupied.len());
        for &cell in &occupied {
            let exposed_axes = [IVec3::X, IVec3::Y, IVec3::Z]
                .iter()
                .filter(|&&axis| {
                    !occupied.contains(&(cell + axis)) || !occupied.contains(&(cell - axis))
                })
                .count();
            let category = match exposed_axes {
                0 => VoxelCategory::Internal,
                1 => VoxelCategory::Face,
                2 => VoxelCategory::Edge,
                _ => VoxelCategory::Corner,
            };
            voxels.push(ModelVoxel {
                position: (cell.as_vec3() + Vec3::splat(0.5)) * voxel_size - center_offset,
                category,
            });
        }

        Self {
            boxes: vec![ModelBox {
                half_extents,
                offset: Vec3::ZERO,
            }],
            center_offset,
            voxel_size,
            voxels,
        }
    }

    /// Grid cell of one model voxel in the transform-origin grid. The cell
    /// is reconstructible from the relative position, the voxel size and
    /// the centre offset.
    pub fn grid_coord(&self, voxel: &ModelVoxel) -> IVec3 {
        let scaled = (voxel.position + self.center_offset) / self.voxel_size;
        IVec3::new(
            scaled.x.floor() as i32,
            scaled.y.floor() as i32,
            scaled.z.floor() as i32,
        )
    }

    pub fn has_voxels(&self) -> bool {
        !self.voxels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_cell_is_a_corner() {
        let model = PhysicsModel::from_voxels(1.0, &[IVec3::ZERO]);
        assert_eq!(model.voxels.len(), 1);
        assert_eq!(model.voxels[0].category, VoxelCategory::Corner);
        assert_eq!(model.center_offset, Vec3::splat(0.5));
        assert_eq!(model.boxes[0].half_extents, Vec3::splat(0.5));
        assert_eq!(model.grid_coord(&model.voxels[0]), IVec3::ZERO);
    }

    #[test]
    fn cube_center_is_internal() {
        // 3x3x3 cube: centre internal, face centres Face, edge midpoints
        // Edge, corners Corner.
        let mut cells = Vec::new();
        for z in 0..3 {
            for y in 0..3 {
                for x in 0..3 {
                    cells.push(IVec3::new(x, y, z));
                }
            }
        }
        let model = PhysicsModel::from_voxels(0.5, &cells);
        let category_of = |cell: IVec3| {
            model
                .voxels
                .iter()
                .find(|v| model.grid_coord(v) == cell)
                .map(|v| v.category)
                .expect("cell present")
        };
        assert_eq!(category_of(IVec3::new(1, 1, 1)), VoxelCategory::Internal);
        assert_eq!(category_of(IVec3::new(1, 1, 0)), VoxelCategory::Face);
        assert_eq!(category_of(IVec3::new(1, 0, 0)), VoxelCategory::Edge);
        assert_eq!(category_of(IVec3::new(0, 0, 0)), VoxelCategory::Corner);
    }

    #[test]
    fn grid_coords_round_trip() {
        let cells = [IVec3::new(-2, 0, 3), IVec3::new(-1, 0, 3), IVec3::new(-2, 1, 3)];
        let model = PhysicsModel::from_voxels(0.25, &cells);
        let mut restored: Vec<IVec3> = model
            .voxels
            .iter()
            .map(|v| model.grid_coord(v))
            .collect();
        restored.sort_by_key(|c| (c.x, c.y, c.z));
        let mut expected = cells.to_vec();
        expected.sort_by_key(|c| (c.x, c.y, c.z));
        assert_eq!(restored, expected);
    }
}
