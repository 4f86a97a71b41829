// source.rs - Built-in sector sources
//
// The streaming controller is generator-agnostic; these cover the common
// cases: a flat floor for tests and sandboxes, and a Perlin heightfield
// for something worth walking around in.

use crate::error::WorldError;
use crate::sector::{Sector, SECTOR_VOXELS};
use crate::streaming::{RegionSpan, SectorSource};
use glam::IVec3;
use noise::{NoiseFn, Perlin};

/// One solid voxel layer at a fixed world height.
pub struct FlatFloorSource {
    pub ground_level: i32,
    pub material: u8,
}

impl FlatFloorSource {
    pub fn new(ground_level: i32, material: u8) -> Self {
        Self {
            ground_level,
            material,
        }
    }
}

impl SectorSource for FlatFloorSource {
    fn load_region(
        &self,
        _region: IVec3,
        span: RegionSpan,
    ) -> Result<Vec<(IVec3, Sector)>, WorldError> {
        let sector_y = self.ground_level.div_euclid(SECTOR_VOXELS);
        let local_y = self.ground_level.rem_euclid(SECTOR_VOXELS);
        let mut out = Vec::new();
        for key in span.iter() {
            if key.y != sector_y {
                continue;
            }
            let mut sector = Sector::new();
            for z in 0..SECTOR_VOXELS {
                for x in 0..SECTOR_VOXELS {
                    sector.set_voxel(IVec3::new(x, local_y, z), self.material);
                }
            }
            out.push((key, sector));
        }
        Ok(out)
    }
}

/// Perlin heightfield: columns of `filler` capped with one `surface` voxel.
pub struct NoiseTerrainSource {
    perlin: Perlin,
    pub base_height: i32,
    pub amplitude: f64,
    pub frequency: f64,
    pub surface: u8,
    pub filler: u8,
}

impl NoiseTerrainSource {
    pub fn new(seed: u32, base_height: i32, amplitude: f64, frequency: f64) -> Self {
        Self {
            perlin: Perlin::new(seed),
            base_height,
            amplitude,
            frequency,
            surface: 2,
            filler: 1,
        }
    }

    fn column_height(&self, world_x: i32, world_z: i32) -> i32 {
        let sample = self.perlin.get([
            world_x as f64 * self.frequency,
            world_z as f64 * self.frequency,
        ]);
        self.base_height + (sample * self.amplitude).round() as i32
    }
}

impl SectorSource for NoiseTerrainSource {
    fn load_region(
        &self,
        _region: IVec3,
        span: RegionSpan,
    ) -> Result<Vec<(IVec3, Sector)>, WorldError> {
        let mut out = Vec::new();
        for key in span.iter() {
            let floor_y = key.y * SECTOR_VOXELS;
            let mut sector = Sector::new();
            let mut wrote = false;
            for z in 0..SECTOR_VOXELS {
                for x in 0..SECTOR_VOXELS {
                    let world_x = key.x * SECTOR_VOXELS + x;
                    let world_z = key.z * SECTOR_VOXELS + z;
                    let height = self.column_height(world_x, world_z);
                    if height < floor_y {
                        continue;
                    }
                    let top = height.min(floor_y + SECTOR_VOXELS - 1);
                    for world_y in floor_y..=top {
                        let material = if world_y == height {
                            self.surface
                        } else {
                            self.filler
                        };
                        sector.set_voxel(
                            IVec3::new(x, world_y - floor_y, z),
                            material,
                        );
                        wrote = true;
                    }
                }
            }
            if wrote {
                out.push((key, sector));
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_floor_only_fills_its_layer_sector() {
        let source = FlatFloorSource::new(0, 1);
        let span = RegionSpan {
            min: IVec3::new(0, -1, 0),
            max: IVec3::new(1, 2, 1),
        };
        let sectors = source.load_region(IVec3::ZERO, span).unwrap();
        assert_eq!(sectors.len(), 1);
        let (key, sector) = &sectors[0];
        assert_eq!(*key, IVec3::ZERO);
        assert_eq!(sector.voxel(IVec3::new(5, 0, 5)), 1);
        assert_eq!(sector.voxel(IVec3::new(5, 1, 5)), 0);
    }

    #[test]
    fn negative_ground_level_lands_in_negative_sector() {
        let source = FlatFloorSource::new(-1, 3);
        let span = RegionSpan {
            min: IVec3::new(0, -1, 0),
            max: IVec3::new(1, 1, 1),
        };
        let sectors = source.load_region(IVec3::ZERO, span).unwrap();
        assert_eq!(sectors.len(), 1);
        let (key, sector) = &sectors[0];
        assert_eq!(*key, IVec3::new(0, -1, 0));
        // World y == -1 is the top local layer of sector y == -1.
        assert_eq!(sector.voxel(IVec3::new(0, SECTOR_VOXELS - 1, 0)), 3);
    }

    #[test]
    fn terrain_is_deterministic_and_capped_with_surface() {
        let source = NoiseTerrainSource::new(7, 8, 4.0, 0.05);
        let span = RegionSpan {
            min: IVec3::ZERO,
            max: IVec3::new(1, 1, 1),
        };
        let first = source.load_region(IVec3::ZERO, span).unwrap();
        let second = source.load_region(IVec3::ZERO, span).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first.len(), second.len());
        let (_, sector) = &first[0];
        // Every column in this sector has its surface voxel on top of
        // filler.
        let height = source.column_height(3, 3);
        assert!(height >= 0 && height < SECTOR_VOXELS);
        assert_eq!(sector.voxel(IVec3::new(3, height, 3)), 2);
        if height > 0 {
            assert_eq!(sector.voxel(IVec3::new(3, height - 1, 3)), 1);
        }
        assert_eq!(sector.voxel(IVec3::new(3, height + 1, 3)), 0);
    }
}
