// sector.rs - Sparse 8^3 grid of bricks
//
// The sector is the unit of streaming and eviction. Bricks exist only where
// something was written; `get_or_create_brick` is the single creation path.

use crate::brick::{Brick, BRICK_DIM};
use glam::IVec3;
use std::collections::HashMap;

/// Bricks per sector axis.
pub const SECTOR_DIM: i32 = 8;

/// Voxels per sector axis.
pub const SECTOR_VOXELS: i32 = SECTOR_DIM * BRICK_DIM;

#[derive(Clone, Default)]
pub struct Sector {
    bricks: HashMap<IVec3, Brick>,
}

impl Sector {
    pub fn new() -> Self {
        Self {
            bricks: HashMap::new(),
        }
    }

    /// Fetch a brick, creating it empty when absent. `at` is the brick
    /// coordinate within the sector, each component in `0..SECTOR_DIM`.
    pub fn get_or_create_brick(&mut self, at: IVec3) -> &mut Brick {
        debug_assert!(
            at.cmpge(IVec3::ZERO).all() && at.cmplt(IVec3::splat(SECTOR_DIM)).all(),
            "brick coordinate {at} outside sector"
        );
        self.bricks.entry(at).or_default()
    }

    pub fn brick(&self, at: IVec3) -> Option<&Brick> {
        self.bricks.get(&at)
    }

    pub fn contains_brick(&self, at: IVec3) -> bool {
        self.bricks.contains_key(&at)
    }

    pub fn bricks(&self) -> impl Iterator<Item = (IVec3, &Brick)> {
        self.bricks.iter().map(|(k, b)| (*k, b))
    }

    pub fn brick_count(&self) -> usize {
        self.bricks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bricks.is_empty()
    }

    /// Write one voxel by sector-local coordinate (`0..SECTOR_VOXELS` per
    /// axis). Returns the brick coordinate that was touched.
    pub fn set_voxel(&mut self, local: IVec3, value: u8) -> IVec3 {
        let brick_at = IVec3::new(
            local.x.div_euclid(BRICK_DIM),
            local.y.div_euclid(BRICK_DIM),
            local.z.div_euclid(BRICK_DIM),
        );
        let cell = IVec3::new(
            local.x.rem_euclid(BRICK_DIM),
            local.y.rem_euclid(BRICK_DIM),
            local.z.rem_euclid(BRICK_DIM),
        );
        self.get_or_create_brick(brick_at)
            .set(cell.x, cell.y, cell.z, value);
        brick_at
    }

    /// Read one voxel by sector-local coordinate; empty cells read 0.
    pub fn voxel(&self, local: IVec3) -> u8 {
        let brick_at = IVec3::new(
            local.x.div_euclid(BRICK_DIM),
            local.y.div_euclid(BRICK_DIM),
            local.z.div_euclid(BRICK_DIM),
        );
        match self.bricks.get(&brick_at) {
            Some(brick) => brick.get(
                local.x.rem_euclid(BRICK_DIM),
                local.y.rem_euclid(BRICK_DIM),
                local.z.rem_euclid(BRICK_DIM),
            ),
            None => 0,
        }
    }
}
