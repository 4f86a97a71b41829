// brick_updates.rs - Dirty-set hand-off to downstream consumers
//
// Runs in PreRender. Drains the map's dirty bricks and sectors into a
// resource that downstream consumers (renderer, nav baker) process and
// clear on their own cadence.

use crate::modules::world_query;
use glam::IVec3;
use strata_core::SystemCtx;
use strata_world::BrickKey;

/// Accumulated changes since the consumers last cleared the queue.
#[derive(Default)]
pub struct BrickUpdates {
    pub bricks: Vec<BrickKey>,
    pub sectors: Vec<IVec3>,
    pub structure_changed: bool,
}

impl BrickUpdates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.bricks.clear();
        self.sectors.clear();
        self.structure_changed = false;
    }

    pub fn is_empty(&self) -> bool {
        self.bricks.is_empty() && self.sectors.is_empty() && !self.structure_changed
    }
}

pub fn collect_brick_updates(ctx: &mut SystemCtx) {
    let Some(world) = world_query(ctx) else {
        return;
    };
    let (bricks, sectors, structure_changed) = world.with_map(|map| {
        let structure_changed = map.structure_dirty();
        if structure_changed {
            map.clear_structure_dirty();
        }
        (map.take_dirty_bricks(), map.take_dirty_sectors(), structure_changed)
    });
    if bricks.is_empty() && sectors.is_empty() && !structure_changed {
        return;
    }
    let Some(updates) = ctx.resource_mut::<BrickUpdates>() else {
        return;
    };
    updates.bricks.extend(bricks);
    updates.sectors.extend(sectors);
    updates.structure_changed |= structure_changed;
}
