// map.rs - Top-level sparse brick map
//
// Sectors live in a hash map keyed by sector coordinate; every non-empty
// brick owns a dense atlas offset handed out by a monotone counter (removed
// bricks leave holes; reclamation is the consumer's problem). Dirty sets
// accumulate until a consumer drains them.

use crate::brick::BRICK_DIM;
use crate::sector::{Sector, SECTOR_VOXELS};
use glam::{IVec3, Vec3};
use std::collections::{HashMap, HashSet};
use strata_core::math::Aabb;

/// Global address of one brick: sector coordinate plus brick-in-sector
/// coordinate.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct BrickKey {
    pub sector: IVec3,
    pub brick: IVec3,
}

pub struct XBrickMap {
    voxel_size: f32,
    sectors: HashMap<IVec3, Sector>,
    brick_atlas: HashMap<BrickKey, u32>,
    next_atlas_offset: u32,
    structure_dirty: bool,
    aabb_dirty: bool,
    cached_min: Vec3,
    cached_max: Vec3,
    dirty_sectors: HashSet<IVec3>,
    dirty_bricks: HashSet<BrickKey>,
}

impl XBrickMap {
    pub fn new(voxel_size: f32) -> Self {
        assert!(voxel_size > 0.0, "voxel size must be positive");
        Self {
            voxel_size,
            sectors: HashMap::new(),
            brick_atlas: HashMap::new(),
            next_atlas_offset: 0,
            structure_dirty: false,
            aabb_dirty: false,
            cached_min: Vec3::ZERO,
            cached_max: Vec3::ZERO,
            dirty_sectors: HashSet::new(),
            dirty_bricks: HashSet::new(),
        }
    }

    pub fn voxel_size(&self) -> f32 {
        self.voxel_size
    }

    /// Sector containing a world voxel index.
    pub fn sector_of_voxel(voxel: IVec3) -> IVec3 {
        IVec3::new(
            voxel.x.div_euclid(SECTOR_VOXELS),
            voxel.y.div_euclid(SECTOR_VOXELS),
            voxel.z.div_euclid(SECTOR_VOXELS),
        )
    }

    /// Brick-in-sector coordinate of a world voxel index.
    pub fn brick_of_voxel(voxel: IVec3) -> IVec3 {
        IVec3::new(
            voxel.x.rem_euclid(SECTOR_VOXELS).div_euclid(BRICK_DIM),
            voxel.y.rem_euclid(SECTOR_VOXELS).div_euclid(BRICK_DIM),
            voxel.z.rem_euclid(SECTOR_VOXELS).div_euclid(BRICK_DIM),
        )
    }

    /// World-space centre of a voxel cell.
    pub fn voxel_center(&self, voxel: IVec3) -> Vec3 {
        (voxel.as_vec3() + Vec3::splat(0.5)) * self.voxel_size
    }

    /// World-space bounds of one sector.
    pub fn sector_bounds(&self, sector: IVec3) -> Aabb {
        let span = SECTOR_VOXELS as f32 * self.voxel_size;
        let min = sector.as_vec3() * span;
        Aabb::new(min, min + Vec3::splat(span))
    }

    /// Write one voxel by world voxel index, creating the sector and brick
    /// on demand and marking both dirty.
    pub fn set_voxel(&mut self, voxel: IVec3, value: u8) {
        let sector_key = Self::sector_of_voxel(voxel);
        if !self.sectors.contains_key(&sector_key) {
            self.sectors.insert(sector_key, Sector::new());
            self.note_sector_added(sector_key);
            self.structure_dirty = true;
        }
        let local = IVec3::new(
            voxel.x.rem_euclid(SECTOR_VOXELS),
            voxel.y.rem_euclid(SECTOR_VOXELS),
            voxel.z.rem_euclid(SECTOR_VOXELS),
        );
        let sector = self
            .sectors
            .get_mut(&sector_key)
            .expect("sector inserted above");
        let had_brick = sector.contains_brick(IVec3::new(
            local.x.div_euclid(BRICK_DIM),
            local.y.div_euclid(BRICK_DIM),
            local.z.div_euclid(BRICK_DIM),
        ));
        let brick = sector.set_voxel(local, value);
        let key = BrickKey {
            sector: sector_key,
            brick,
        };
        if !had_brick {
            self.register_brick(key);
        }
        self.dirty_bricks.insert(key);
        self.dirty_sectors.insert(sector_key);
    }

    /// Read one voxel by world voxel index; missing space reads 0.
    pub fn voxel_at(&self, voxel: IVec3) -> u8 {
        let sector_key = Self::sector_of_voxel(voxel);
        match self.sectors.get(&sector_key) {
            Some(sector) => sector.voxel(IVec3::new(
                voxel.x.rem_euclid(SECTOR_VOXELS),
                voxel.y.rem_euclid(SECTOR_VOXELS),
                voxel.z.rem_euclid(SECTOR_VOXELS),
            )),
            None => 0,
        }
    }

    pub fn is_solid(&self, voxel: IVec3) -> bool {
        self.voxel_at(voxel) != 0
    }

    /// Insert a whole sector (streaming publish path): assigns atlas offsets
    /// for its bricks, expands the cached bounds, and emits the dirty
    /// notifications downstream consumers pick up.
    pub fn insert_sector(&mut self, key: IVec3, sector: Sector) {
        let bricks: Vec<IVec3> = sector.bricks().map(|(at, _)| at).collect();
        if let Some(previous) = self.sectors.insert(key, sector) {
            // Replacing a sector orphans its old atlas entries.
            for (at, _) in previous.bricks() {
                self.brick_atlas.remove(&BrickKey { sector: key, brick: at });
            }
        }
        for at in bricks {
            self.register_brick(BrickKey {
                sector: key,
                brick: at,
            });
        }
        self.note_sector_added(key);
        // Wake downstream consumers for the whole sector.
        self.dirty_bricks.insert(BrickKey {
            sector: key,
            brick: IVec3::ZERO,
        });
        self.dirty_sectors.insert(key);
        self.structure_dirty = true;
    }

    /// Remove a sector (eviction path), dropping its atlas entries.
    pub fn remove_sector(&mut self, key: IVec3) -> Option<Sector> {
        let sector = self.sectors.remove(&key)?;
        for (at, _) in sector.bricks() {
            self.brick_atlas.remove(&BrickKey {
                sector: key,
                brick: at,
            });
        }
        self.dirty_sectors.insert(key);
        self.structure_dirty = true;
        self.aabb_dirty = true;
        Some(sector)
    }

    pub fn sector(&self, key: IVec3) -> Option<&Sector> {
        self.sectors.get(&key)
    }

    pub fn contains_sector(&self, key: IVec3) -> bool {
        self.sectors.contains_key(&key)
    }

    pub fn sector_count(&self) -> usize {
        self.sectors.len()
    }

    pub fn sector_keys(&self) -> impl Iterator<Item = IVec3> + '_ {
        self.sectors.keys().copied()
    }

    pub fn atlas_offset(&self, key: BrickKey) -> Option<u32> {
        self.brick_atlas.get(&key).copied()
    }

    pub fn atlas_len(&self) -> usize {
        self.brick_atlas.len()
    }

    pub fn atlas_keys(&self) -> impl Iterator<Item = BrickKey> + '_ {
        self.brick_atlas.keys().copied()
    }

    pub fn next_atlas_offset(&self) -> u32 {
        self.next_atlas_offset
    }

    pub fn structure_dirty(&self) -> bool {
        self.structure_dirty
    }

    pub fn clear_structure_dirty(&mut self) {
        self.structure_dirty = false;
    }

    /// Drain the brick dirty set (consumer reset).
    pub fn take_dirty_bricks(&mut self) -> Vec<BrickKey> {
        self.dirty_bricks.drain().collect()
    }

    /// Drain the sector dirty set (consumer reset).
    pub fn take_dirty_sectors(&mut self) -> Vec<IVec3> {
        self.dirty_sectors.drain().collect()
    }

    pub fn dirty_brick_count(&self) -> usize {
        self.dirty_bricks.len()
    }

    pub fn dirty_sector_count(&self) -> usize {
        self.dirty_sectors.len()
    }

    /// World bounds of all loaded sectors; recomputed when invalidated by an
    /// eviction, expanded incrementally on insertion.
    pub fn world_aabb(&mut self) -> Option<Aabb> {
        if self.sectors.is_empty() {
            self.aabb_dirty = false;
            return None;
        }
        if self.aabb_dirty {
            let mut bounds: Option<Aabb> = None;
            let keys: Vec<IVec3> = self.sectors.keys().copied().collect();
            for key in keys {
                let sector_bounds = self.sector_bounds(key);
                bounds = Some(match bounds {
                    Some(b) => b.union(&sector_bounds),
                    None => sector_bounds,
                });
            }
            let bounds = bounds.expect("non-empty sector map has bounds");
            self.cached_min = bounds.min;
            self.cached_max = bounds.max;
            self.aabb_dirty = false;
        }
        Some(Aabb::new(self.cached_min, self.cached_max))
    }

    /// Occupied world voxel indices intersecting `bounds`. Intended for
    /// modest boxes (physics sampling around a body).
    pub fn solids_in(&self, bounds: Aabb) -> Vec<IVec3> {
        let min = (bounds.min / self.voxel_size).floor();
        let max = (bounds.max / self.voxel_size).floor();
        let min = IVec3::new(min.x as i32, min.y as i32, min.z as i32);
        let max = IVec3::new(max.x as i32, max.y as i32, max.z as i32);
        let mut out = Vec::new();
        for z in min.z..=max.z {
            for y in min.y..=max.y {
                for x in min.x..=max.x {
                    let v = IVec3::new(x, y, z);
                    if self.is_solid(v) {
                        out.push(v);
                    }
                }
            }
        }
        out
    }

    fn register_brick(&mut self, key: BrickKey) {
        if self.brick_atlas.contains_key(&key) {
            return;
        }
        let offset = self.next_atlas_offset;
        self.next_atlas_offset += 1;
        self.brick_atlas.insert(key, offset);
        self.structure_dirty = true;
    }

    /// Incremental AABB maintenance on sector insertion: initialise on the
    /// 0 -> 1 transition, expand otherwise, and leave an invalidated cache
    /// alone (the next `world_aabb` call recomputes it).
    fn note_sector_added(&mut self, key: IVec3) {
        let bounds = self.sector_bounds(key);
        if self.sectors.len() == 1 {
            self.cached_min = bounds.min;
            self.cached_max = bounds.max;
            self.aabb_dirty = false;
        } else if !self.aabb_dirty {
            self.cached_min = self.cached_min.min(bounds.min);
            self.cached_max = self.cached_max.max(bounds.max);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atlas_matches_sector_contents() {
        let mut map = XBrickMap::new(1.0);
        map.set_voxel(IVec3::new(0, 0, 0), 1);
        map.set_voxel(IVec3::new(70, 0, 0), 2); // second sector
        for key in map.atlas_keys().collect::<Vec<_>>() {
            let sector = map.sector(key.sector).expect("atlas brick has a sector");
            assert!(sector.contains_brick(key.brick));
        }
        assert_eq!(map.atlas_len(), 2);
    }

    #[test]
    fn next_atlas_offset_is_monotone() {
        let mut map = XBrickMap::new(1.0);
        let mut last = map.next_atlas_offset();
        for i in 0..20 {
            map.set_voxel(IVec3::new(i * 8, 0, 0), 1);
            let next = map.next_atlas_offset();
            assert!(next >= last);
            last = next;
        }
        // Eviction leaves holes; the counter never rewinds.
        map.remove_sector(IVec3::ZERO);
        assert_eq!(map.next_atlas_offset(), last);
    }

    #[test]
    fn set_voxel_marks_brick_and_sector_dirty() {
        let mut map = XBrickMap::new(1.0);
        map.set_voxel(IVec3::new(9, 1, 2), 5);
        let bricks = map.take_dirty_bricks();
        assert!(bricks.contains(&BrickKey {
            sector: IVec3::ZERO,
            brick: IVec3::new(1, 0, 0),
        }));
        assert_eq!(map.take_dirty_sectors(), vec![IVec3::ZERO]);
        // Drained sets stay empty until the next write.
        assert_eq!(map.dirty_brick_count(), 0);
        map.set_voxel(IVec3::new(9, 1, 2), 6);
        assert_eq!(map.dirty_brick_count(), 1);
    }

    #[test]
    fn negative_coordinates_map_to_negative_sectors() {
        let mut map = XBrickMap::new(1.0);
        map.set_voxel(IVec3::new(-1, 0, 0), 9);
        assert!(map.contains_sector(IVec3::new(-1, 0, 0)));
        assert_eq!(map.voxel_at(IVec3::new(-1, 0, 0)), 9);
        assert_eq!(map.voxel_at(IVec3::new(-2, 0, 0)), 0);
    }

    #[test]
    fn aabb_expands_incrementally_and_recomputes_after_eviction() {
        let mut map = XBrickMap::new(1.0);
        map.set_voxel(IVec3::ZERO, 1);
        let first = map.world_aabb().expect("one sector loaded");
        assert_eq!(first.min, Vec3::ZERO);
        assert_eq!(first.max, Vec3::splat(64.0));
        map.set_voxel(IVec3::new(64, 0, 0), 1);
        let grown = map.world_aabb().expect("two sectors loaded");
        assert_eq!(grown.max, Vec3::new(128.0, 64.0, 64.0));
        map.remove_sector(IVec3::new(1, 0, 0));
        let shrunk = map.world_aabb().expect("one sector left");
        assert_eq!(shrunk.max, Vec3::splat(64.0));
        map.remove_sector(IVec3::ZERO);
        assert!(map.world_aabb().is_none());
    }

    #[test]
    fn solids_in_reports_occupied_cells() {
        let mut map = XBrickMap::new(1.0);
        map.set_voxel(IVec3::ZERO, 1);
        map.set_voxel(IVec3::new(2, 0, 0), 1);
        let hits = map.solids_in(Aabb::new(Vec3::splat(-0.5), Vec3::new(1.4, 0.9, 0.9)));
        assert_eq!(hits, vec![IVec3::ZERO]);
    }
}
