//! Strata Engine Voxel World
//!
//! Sparse three-level voxel storage (sector -> brick -> voxel) streamed
//! around a focus point, with dirty-set bookkeeping for downstream
//! consumers (renderer, nav baker) and optional per-sector persistence.

mod brick;
mod error;
mod map;
mod palette;
mod persist;
mod raycast;
mod region;
mod sector;
mod source;
mod streaming;

pub use brick::{Brick, BRICK_DIM, BRICK_VOLUME};
pub use error::WorldError;
pub use map::{BrickKey, XBrickMap};
pub use palette::{Palette, Rgba8};
pub use persist::{read_sector, write_sector, DiskSource, SectorStore};
pub use raycast::{raycast, RayHit};
pub use region::Region;
pub use sector::{Sector, SECTOR_DIM, SECTOR_VOXELS};
pub use source::{FlatFloorSource, NoiseTerrainSource};
pub use streaming::{RegionSpan, SectorSource, VoxelWorld};
