// region.rs - Streaming ownership of a cubic block of sectors

use glam::IVec3;
use std::collections::HashSet;

/// A cubic block of sectors owned by the streaming controller. On eviction
/// its sectors are removed from the map; sector keys published after the
/// region is gone are discarded at the next publish step.
#[derive(Clone, Debug)]
pub struct Region {
    pub coords: IVec3,
    pub sectors: HashSet<IVec3>,
}

impl Region {
    pub fn new(coords: IVec3) -> Self {
        Self {
            coords,
            sectors: HashSet::new(),
        }
    }
}
