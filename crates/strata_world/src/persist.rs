// persist.rs - Per-sector binary persistence
//
// One file per sector keyed by (sx, sy, sz). Layout:
//   magic u32 LE, version u16 LE, brick_count u16 LE,
//   then per brick: bx, by, bz (u8 each), one pad byte, 512 palette bytes.
// Bricks are written in sorted coordinate order so files are deterministic.

use crate::brick::{Brick, BRICK_VOLUME};
use crate::error::WorldError;
use crate::map::XBrickMap;
use crate::sector::{Sector, SECTOR_DIM};
use crate::streaming::{RegionSpan, SectorSource};
use glam::IVec3;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

pub const SECTOR_MAGIC: u32 = 0x5342_524B; // "SBRK"
pub const SECTOR_VERSION: u16 = 1;

pub fn write_sector<W: Write>(writer: &mut W, sector: &Sector) -> Result<(), WorldError> {
    let mut bricks: Vec<(IVec3, &Brick)> = sector.bricks().collect();
    bricks.sort_by_key(|(at, _)| (at.z, at.y, at.x));
    if bricks.len() > u16::MAX as usize {
        return Err(WorldError::Corrupt(format!(
            "sector holds {} bricks, more than the format can index",
            bricks.len()
        )));
    }
    writer.write_all(&SECTOR_MAGIC.to_le_bytes())?;
    writer.write_all(&SECTOR_VERSION.to_le_bytes())?;
    writer.write_all(&(bricks.len() as u16).to_le_bytes())?;
    for (at, brick) in bricks {
        writer.write_all(&[at.x as u8, at.y as u8, at.z as u8, 0])?;
        writer.write_all(brick.bytes())?;
    }
    Ok(())
}

pub fn read_sector<R: Read>(reader: &mut R) -> Result<Sector, WorldError> {
    let mut word = [0u8; 4];
    reader.read_exact(&mut word)?;
    if u32::from_le_bytes(word) != SECTOR_MAGIC {
        return Err(WorldError::Corrupt("bad magic".to_string()));
    }
    let mut half = [0u8; 2];
    reader.read_exact(&mut half)?;
    let version = u16::from_le_bytes(half);
    if version != SECTOR_VERSION {
        return Err(WorldError::UnsupportedVersion(version));
    }
    reader.read_exact(&mut half)?;
    let brick_count = u16::from_le_bytes(half);

    let mut sector = Sector::new();
    let mut payload = [0u8; BRICK_VOLUME];
    for _ in 0..brick_count {
        let mut coord = [0u8; 4];
        reader.read_exact(&mut coord)?;
        let at = IVec3::new(coord[0] as i32, coord[1] as i32, coord[2] as i32);
        if at.cmpge(IVec3::splat(SECTOR_DIM)).any() {
            return Err(WorldError::Corrupt(format!(
                "brick coordinate {at} outside sector"
            )));
        }
        reader.read_exact(&mut payload)?;
        sector.get_or_create_brick(at).load_bytes(&payload);
    }
    Ok(sector)
}

/// Directory of sector files, one per sector coordinate.
pub struct SectorStore {
    root: PathBuf,
}

impl SectorStore {
    pub fn open(root: impl AsRef<Path>) -> Result<Self, WorldError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: IVec3) -> PathBuf {
        self.root
            .join(format!("sector_{}_{}_{}.sbrk", key.x, key.y, key.z))
    }

    pub fn save_sector(&self, key: IVec3, sector: &Sector) -> Result<(), WorldError> {
        let mut writer = BufWriter::new(File::create(self.path_for(key))?);
        write_sector(&mut writer, sector)?;
        writer.flush()?;
        Ok(())
    }

    /// Load one sector; Ok(None) when no file exists for the key.
    pub fn load_sector(&self, key: IVec3) -> Result<Option<Sector>, WorldError> {
        let file = match File::open(self.path_for(key)) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let mut reader = BufReader::new(file);
        Ok(Some(read_sector(&mut reader)?))
    }

    /// Persist every sector of a map.
    pub fn save_map(&self, map: &XBrickMap) -> Result<(), WorldError> {
        for key in map.sector_keys().collect::<Vec<_>>() {
            if let Some(sector) = map.sector(key) {
                self.save_sector(key, sector)?;
            }
        }
        Ok(())
    }
}

/// Read-through persistence wrapper: serves a region from sector files when
/// any exist, otherwise generates it with the inner source and saves the
/// result for next time.
pub struct DiskSource<S: SectorSource> {
    store: SectorStore,
    inner: S,
}

impl<S: SectorSource> DiskSource<S> {
    pub fn new(store: SectorStore, inner: S) -> Self {
        Self { store, inner }
    }
}

impl<S: SectorSource> SectorSource for DiskSource<S> {
    fn load_region(
        &self,
        region: IVec3,
        span: RegionSpan,
    ) -> Result<Vec<(IVec3, Sector)>, WorldError> {
        let mut cached = Vec::new();
        for key in span.iter() {
            if let Some(sector) = self.store.load_sector(key)? {
                cached.push((key, sector));
            }
        }
        if !cached.is_empty() {
            tracing::debug!(?region, sectors = cached.len(), "region served from disk");
            return Ok(cached);
        }
        let generated = self.inner.load_region(region, span)?;
        for (key, sector) in &generated {
            self.store.save_sector(*key, sector)?;
        }
        Ok(generated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_sector() -> Sector {
        let mut sector = Sector::new();
        sector.set_voxel(IVec3::new(0, 0, 0), 1);
        sector.set_voxel(IVec3::new(63, 63, 63), 200);
        sector.set_voxel(IVec3::new(12, 34, 56), 7);
        sector
    }

    #[test]
    fn sector_file_round_trip() {
        let sector = sample_sector();
        let mut bytes = Vec::new();
        write_sector(&mut bytes, &sector).unwrap();
        let restored = read_sector(&mut bytes.as_slice()).unwrap();
        assert_eq!(restored.brick_count(), sector.brick_count());
        for probe in [
            IVec3::new(0, 0, 0),
            IVec3::new(63, 63, 63),
            IVec3::new(12, 34, 56),
            IVec3::new(1, 1, 1),
        ] {
            assert_eq!(restored.voxel(probe), sector.voxel(probe));
        }
    }

    #[test]
    fn bad_magic_is_corrupt() {
        let bytes = [0u8; 8];
        assert!(matches!(
            read_sector(&mut bytes.as_slice()),
            Err(WorldError::Corrupt(_))
        ));
    }

    #[test]
    fn store_round_trips_by_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = SectorStore::open(dir.path()).unwrap();
        let key = IVec3::new(-2, 0, 5);
        store.save_sector(key, &sample_sector()).unwrap();
        let loaded = store.load_sector(key).unwrap().expect("sector saved");
        assert_eq!(loaded.voxel(IVec3::new(12, 34, 56)), 7);
        assert!(store.load_sector(IVec3::ZERO).unwrap().is_none());
    }

    #[test]
    fn disk_source_caches_generated_regions() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let dir = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let generator = {
            let calls = calls.clone();
            move |_region: IVec3, span: RegionSpan| -> Result<Vec<(IVec3, Sector)>, WorldError> {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(vec![(span.min, sample_sector())])
            }
        };
        let source = DiskSource::new(SectorStore::open(dir.path()).unwrap(), generator);
        let span = RegionSpan {
            min: IVec3::ZERO,
            max: IVec3::splat(1),
        };
        let first = source.load_region(IVec3::ZERO, span).unwrap();
        let second = source.load_region(IVec3::ZERO, span).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
