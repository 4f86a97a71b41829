// streaming.rs - Region streaming around a focus point
//
// One mutex guards the loaded-region table, the pending-sector queue and
// the sector map itself; background loaders take it only to publish their
// results. The main-thread update publishes a bounded number of pending
// sectors per tick, computes the desired region cube from the focus
// position, launches loads for absent regions and evicts stale ones.

use crate::error::WorldError;
use crate::map::XBrickMap;
use crate::region::Region;
use crate::sector::{Sector, SECTOR_VOXELS};
use glam::{IVec3, Vec3};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Absolute sector-key range of one region (`min` inclusive, `max`
/// exclusive).
#[derive(Copy, Clone, Debug)]
pub struct RegionSpan {
    pub min: IVec3,
    pub max: IVec3,
}

impl RegionSpan {
    pub fn contains(&self, sector: IVec3) -> bool {
        sector.cmpge(self.min).all() && sector.cmplt(self.max).all()
    }

    pub fn iter(&self) -> impl Iterator<Item = IVec3> + '_ {
        let (min, max) = (self.min, self.max);
        (min.z..max.z).flat_map(move |z| {
            (min.y..max.y)
                .flat_map(move |y| (min.x..max.x).map(move |x| IVec3::new(x, y, z)))
        })
    }
}

/// Produces the populated sectors of a region. Implementations may block on
/// IO; they run on the background pool.
pub trait SectorSource: Send + Sync + 'static {
    fn load_region(&self, region: IVec3, span: RegionSpan)
        -> Result<Vec<(IVec3, Sector)>, WorldError>;
}

impl<F> SectorSource for F
where
    F: Fn(IVec3, RegionSpan) -> Result<Vec<(IVec3, Sector)>, WorldError> + Send + Sync + 'static,
{
    fn load_region(
        &self,
        region: IVec3,
        span: RegionSpan,
    ) -> Result<Vec<(IVec3, Sector)>, WorldError> {
        self(region, span)
    }
}

struct PendingSector {
    region: IVec3,
    sector: Sector,
}

struct WorldShared {
    loaded_regions: HashMap<IVec3, Region>,
    pending_sectors: HashMap<IVec3, PendingSector>,
    map: XBrickMap,
}

/// Streaming world state, stored as a component on the world entity.
/// Cloning shares the underlying state.
#[derive(Clone)]
pub struct VoxelWorld {
    voxel_size: f32,
    region_radius: f32,
    region_size: i32, // sectors per region axis
    publish_budget: usize,
    shared: Arc<Mutex<WorldShared>>,
    source: Arc<dyn SectorSource>,
    in_flight: Arc<AtomicUsize>,
}

impl VoxelWorld {
    /// Sectors moved from pending into the map per tick.
    pub const PUBLISH_BUDGET: usize = 128;

    pub fn new(
        voxel_size: f32,
        region_radius: f32,
        region_size: i32,
        source: Arc<dyn SectorSource>,
    ) -> Self {
        assert!(region_size > 0, "region must span at least one sector");
        Self {
            voxel_size,
            region_radius,
            region_size,
            publish_budget: Self::PUBLISH_BUDGET,
            shared: Arc::new(Mutex::new(WorldShared {
                loaded_regions: HashMap::new(),
                pending_sectors: HashMap::new(),
                map: XBrickMap::new(voxel_size),
            })),
            source,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn voxel_size(&self) -> f32 {
        self.voxel_size
    }

    /// World-space edge length of one region.
    pub fn region_stride(&self) -> f32 {
        self.region_size as f32 * SECTOR_VOXELS as f32 * self.voxel_size
    }

    /// Advance streaming for this tick.
    pub fn update(&self, focus: Vec3) {
        self.publish_pending();
        let desired = self.desired_regions(focus);
        self.load_absent(&desired);
        self.evict_stale(&desired);
    }

    /// Step 1: move up to the publish budget of pending sectors into the
    /// map. Sectors whose owning region was evicted while the load was in
    /// flight are discarded here.
    fn publish_pending(&self) {
        let mut guard = self.shared.lock();
        let shared = &mut *guard;
        if shared.pending_sectors.is_empty() {
            return;
        }
        let batch: Vec<IVec3> = shared
            .pending_sectors
            .keys()
            .copied()
            .take(self.publish_budget)
            .collect();
        let mut published = 0usize;
        for key in batch {
            let pending = shared
                .pending_sectors
                .remove(&key)
                .expect("pending key vanished during publish");
            if !shared.loaded_regions.contains_key(&pending.region) {
                tracing::debug!(sector = ?key, region = ?pending.region, "discarding orphaned sector");
                continue;
            }
            shared.map.insert_sector(key, pending.sector);
            published += 1;
        }
        if published > 0 {
            tracing::trace!(published, remaining = shared.pending_sectors.len(), "published sectors");
        }
    }

    /// Step 2: the cube of regions around the focus position.
    fn desired_regions(&self, focus: Vec3) -> HashSet<IVec3> {
        let stride = self.region_stride();
        let center = IVec3::new(
            (focus.x / stride).floor() as i32,
            (focus.y / stride).floor() as i32,
            (focus.z / stride).floor() as i32,
        );
        let radius = (self.region_radius / stride).ceil() as i32;
        let mut desired = HashSet::new();
        for z in -radius..=radius {
            for y in -radius..=radius {
                for x in -radius..=radius {
                    desired.insert(center + IVec3::new(x, y, z));
                }
            }
        }
        desired
    }

    /// Step 3: create absent regions synchronously and launch one background
    /// load per region; the loader publishes under the lock.
    fn load_absent(&self, desired: &HashSet<IVec3>) {
        let mut guard = self.shared.lock();
        for &region in desired {
            if guard.loaded_regions.contains_key(&region) {
                continue;
            }
            guard.loaded_regions.insert(region, Region::new(region));
            let span = self.region_span(region);
            let shared = Arc::clone(&self.shared);
            let source = Arc::clone(&self.source);
            let in_flight = Arc::clone(&self.in_flight);
            in_flight.fetch_add(1, Ordering::SeqCst);
            rayon::spawn(move || {
                match source.load_region(region, span) {
                    Ok(sectors) => {
                        let mut guard = shared.lock();
                        let shared = &mut *guard;
                        match shared.loaded_regions.get_mut(&region) {
                            Some(owner) => {
                                for (key, sector) in sectors {
                                    owner.sectors.insert(key);
                                    shared
                                        .pending_sectors
                                        .insert(key, PendingSector { region, sector });
                                }
                            }
                            None => {
                                tracing::debug!(?region, "region evicted mid-load; result dropped")
                            }
                        }
                    }
                    Err(err) => {
                        // The region stays empty; no automatic retry.
                        tracing::warn!(%err, ?region, "background sector load failed");
                    }
                }
                in_flight.fetch_sub(1, Ordering::SeqCst);
            });
        }
    }

    /// Step 4: drop regions outside the desired set, removing their sectors
    /// from the map and purging their pending publications.
    fn evict_stale(&self, desired: &HashSet<IVec3>) {
        let mut guard = self.shared.lock();
        let shared = &mut *guard;
        let stale: Vec<IVec3> = shared
            .loaded_regions
            .keys()
            .copied()
            .filter(|r| !desired.contains(r))
            .collect();
        for region in stale {
            let owned = shared
                .loaded_regions
                .remove(&region)
                .expect("stale region disappeared during eviction");
            for sector in &owned.sectors {
                shared.map.remove_sector(*sector);
            }
            shared.pending_sectors.retain(|_, p| p.region != region);
            tracing::debug!(?region, sectors = owned.sectors.len(), "evicted region");
        }
    }

    fn region_span(&self, region: IVec3) -> RegionSpan {
        let min = region * self.region_size;
        RegionSpan {
            min,
            max: min + IVec3::splat(self.region_size),
        }
    }

    /// Run a closure against the map under the world lock.
    pub fn with_map<R>(&self, f: impl FnOnce(&mut XBrickMap) -> R) -> R {
        f(&mut self.shared.lock().map)
    }

    pub fn sector_count(&self) -> usize {
        self.shared.lock().map.sector_count()
    }

    pub fn pending_count(&self) -> usize {
        self.shared.lock().pending_sectors.len()
    }

    pub fn loaded_region_count(&self) -> usize {
        self.shared.lock().loaded_regions.len()
    }

    /// Background loads currently running or waiting to publish.
    pub fn in_flight_loads(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    /// One floor sector per region at y == 0.
    fn floor_source() -> Arc<dyn SectorSource> {
        Arc::new(|region: IVec3, span: RegionSpan| -> Result<Vec<(IVec3, Sector)>, WorldError> {
            if region.y != 0 {
                return Ok(Vec::new());
            }
            let mut sector = Sector::new();
            for z in 0..SECTOR_VOXELS {
                for x in 0..SECTOR_VOXELS {
                    sector.set_voxel(IVec3::new(x, 0, z), 1);
                }
            }
            Ok(vec![(IVec3::new(span.min.x, 0, span.min.z), sector)])
        })
    }

    fn settle(world: &VoxelWorld, focus: Vec3, until: impl Fn(&VoxelWorld) -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            world.update(focus);
            if until(world) {
                return;
            }
            assert!(Instant::now() < deadline, "streaming did not settle in time");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn publish_then_evict_round_trip() {
        let world = VoxelWorld::new(1.0, 0.0, 1, floor_source());
        settle(&world, Vec3::ZERO, |w| w.sector_count() > 0);

        let keys: Vec<IVec3> = world.with_map(|map| {
            assert!(map.structure_dirty());
            assert!(map.dirty_brick_count() > 0);
            map.sector_keys().collect()
        });
        assert!(keys.contains(&IVec3::ZERO));

        // Move the focus far enough that the origin region is undesired.
        let far = Vec3::splat(10.0 * world.region_stride());
        settle(&world, far, |w| {
            w.with_map(|map| !map.contains_sector(IVec3::ZERO))
        });
        for key in keys {
            assert!(world.with_map(|map| !map.contains_sector(key)));
        }
    }

    #[test]
    fn failed_load_leaves_region_empty() {
        let source: Arc<dyn SectorSource> =
            Arc::new(|_region: IVec3, _span: RegionSpan| -> Result<Vec<(IVec3, Sector)>, WorldError> {
                Err(WorldError::Corrupt("generator exploded".to_string()))
            });
        let world = VoxelWorld::new(1.0, 0.0, 1, source);
        let deadline = Instant::now() + Duration::from_secs(5);
        world.update(Vec3::ZERO);
        while world.in_flight_loads() > 0 {
            assert!(Instant::now() < deadline);
            std::thread::sleep(Duration::from_millis(5));
        }
        world.update(Vec3::ZERO);
        assert_eq!(world.sector_count(), 0);
        assert_eq!(world.loaded_region_count(), 1);
    }

    #[test]
    fn publish_budget_bounds_one_tick() {
        // A region producing more sectors than the budget takes two ticks.
        let source: Arc<dyn SectorSource> =
            Arc::new(|_region: IVec3, span: RegionSpan| -> Result<Vec<(IVec3, Sector)>, WorldError> {
                let mut out = Vec::new();
                for key in span.iter() {
                    let mut sector = Sector::new();
                    sector.set_voxel(IVec3::ZERO, 1);
                    out.push((key, sector));
                }
                Ok(out)
            });
        // 6^3 = 216 sectors > 128 budget.
        let world = VoxelWorld::new(1.0, 0.0, 6, source);
        let deadline = Instant::now() + Duration::from_secs(5);
        world.update(Vec3::ZERO);
        while world.pending_count() == 0 {
            assert!(Instant::now() < deadline, "load never published");
            std::thread::sleep(Duration::from_millis(5));
        }
        while world.in_flight_loads() > 0 {
            std::thread::sleep(Duration::from_millis(5));
        }
        world.update(Vec3::ZERO);
        assert_eq!(world.sector_count(), VoxelWorld::PUBLISH_BUDGET);
        world.update(Vec3::ZERO);
        assert_eq!(world.sector_count(), 216);
    }
}
