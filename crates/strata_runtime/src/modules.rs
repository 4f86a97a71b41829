// modules.rs - App modules wiring the engine crates together

use crate::brick_updates::{collect_brick_updates, BrickUpdates};
use crate::components::{StreamingFocus, Transform};
use crate::physics_sync::physics_sync;
use crate::world_stream::world_stream;
use std::sync::Arc;
use strata_core::{App, Module, Stage, SystemCtx};
use strata_physics::{
    spawn_physics_thread, Collider, PhysicsHandle, PhysicsModel, PhysicsProxy, RigidBody,
    SimConfig,
};
use strata_world::VoxelWorld;

/// Resource linking the scheduler to the physics thread's mailboxes.
pub struct PhysicsLink {
    pub proxy: Arc<PhysicsProxy>,
}

/// First voxel world component in the store, if any. Cloning shares the
/// underlying streaming state.
pub(crate) fn world_query(ctx: &mut SystemCtx) -> Option<VoxelWorld> {
    ctx.query::<(&mut VoxelWorld,)>()
        .map(|(_, (world,))| world.clone())
        .next()
}

/// Installs the voxel world entity and the streaming system.
pub struct WorldModule {
    world: VoxelWorld,
}

impl WorldModule {
    pub fn new(world: VoxelWorld) -> Self {
        Self { world }
    }
}

impl Module for WorldModule {
    fn install(&self, app: &mut App) {
        app.register_component::<Transform>();
        app.register_component::<StreamingFocus>();
        app.register_component::<VoxelWorld>();
        app.commands_mut().add_entity((self.world.clone(),));
        app.insert_resource(BrickUpdates::new());
        app.use_system("world_stream", world_stream)
            .in_stage(Stage::PreUpdate)
            .run_always();
        app.use_system("collect_brick_updates", collect_brick_updates)
            .in_stage(Stage::PreRender)
            .reads_resource::<BrickUpdates>();
    }
}

/// Spawns the physics thread and installs the sync system.
pub struct PhysicsModule {
    config: SimConfig,
    rate_hz: u32,
}

impl PhysicsModule {
    pub fn new(config: SimConfig, rate_hz: u32) -> Self {
        Self { config, rate_hz }
    }
}

impl Module for PhysicsModule {
    fn install(&self, app: &mut App) {
        app.register_component::<Transform>();
        app.register_component::<RigidBody>();
        app.register_component::<Collider>();
        app.register_component::<PhysicsModel>();
        let proxy = Arc::new(PhysicsProxy::new());
        match spawn_physics_thread(Arc::clone(&proxy), self.config, self.rate_hz) {
            Ok(handle) => {
                app.insert_resource(PhysicsLink { proxy });
                app.insert_resource(handle);
                app.use_system("physics_sync", physics_sync)
                    .in_stage(Stage::Update)
                    .run_always()
                    .reads_resource::<PhysicsLink>();
            }
            Err(err) => {
                tracing::error!(%err, "failed to spawn physics thread; physics disabled");
            }
        }
    }
}

/// Stop the physics thread and wait for it to exit.
pub fn shutdown_physics(app: &mut App) {
    if let Some(handle) = app.resources_mut().remove::<PhysicsHandle>() {
        handle.shutdown();
    }
}
