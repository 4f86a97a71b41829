// world_stream.rs - Streaming system
//
// Runs in PreUpdate. Advances the voxel world around the focus entity's
// position; without a focus entity there is no streaming work.

use crate::components::{StreamingFocus, Transform};
use strata_core::{SystemCtx, With};

pub fn world_stream(ctx: &mut SystemCtx) {
    let focus = ctx
        .query::<(&mut Transform, With<StreamingFocus>)>()
        .map(|(_, (transform, ()))| transform.position)
        .next();
    let Some(focus) = focus else {
        return;
    };
    if let Some(world) = crate::modules::world_query(ctx) {
        world.update(focus);
    }
}
