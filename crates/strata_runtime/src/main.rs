//! Strata Engine Runtime
//!
//! Headless demo binary: streams a flat voxel floor around a focus entity
//! and drops a handful of rigid bodies onto it through the async physics
//! loop, then shuts down cleanly.

use anyhow::Result;
use glam::{IVec3, Vec3};
use std::sync::Arc;
use strata_core::time::Ticker;
use strata_core::App;
use strata_physics::{Collider, PhysicsModel, RigidBody, SimConfig};
use strata_runtime::{
    shutdown_physics, ModelAssets, PhysicsModule, Settings, StreamingFocus, Transform,
    WorldModule,
};
use strata_world::{DiskSource, FlatFloorSource, SectorSource, SectorStore, VoxelWorld};

fn build_world(settings: &Settings) -> Result<VoxelWorld> {
    let floor = FlatFloorSource::new(0, 1);
    let source: Arc<dyn SectorSource> = match &settings.persist_root {
        Some(root) => Arc::new(DiskSource::new(SectorStore::open(root)?, floor)),
        None => Arc::new(floor),
    };
    Ok(VoxelWorld::new(
        settings.voxel_size,
        settings.region_radius,
        settings.region_size,
        source,
    ))
}

fn spawn_demo_scene(app: &mut App) {
    let mut assets = ModelAssets::new();
    let unit_box = assets.insert(PhysicsModel::single_box(Vec3::splat(0.5)));
    let crate_model = assets.insert(PhysicsModel::from_voxels(
        0.5,
        &[
            IVec3::new(0, 0, 0),
            IVec3::new(1, 0, 0),
            IVec3::new(0, 1, 0),
            IVec3::new(1, 1, 0),
            IVec3::new(0, 0, 1),
            IVec3::new(1, 0, 1),
            IVec3::new(0, 1, 1),
            IVec3::new(1, 1, 1),
        ],
    ));

    let commands = app.commands_mut();
    commands.add_entity((Transform::from_position(Vec3::new(0.0, 2.0, 0.0)), StreamingFocus));
    for (i, asset) in [unit_box, crate_model, unit_box, crate_model].iter().enumerate() {
        let position = Vec3::new(i as f32 * 1.5 - 2.0, 6.0 + i as f32 * 1.5, 0.5);
        commands.add_entity((
            Transform::from_position(position),
            RigidBody::dynamic(1.0),
            Collider::new(0.5, 0.1),
            asset_model(&assets, *asset),
        ));
    }
    app.insert_resource(assets);
}

fn asset_model(assets: &ModelAssets, id: strata_runtime::AssetId) -> PhysicsModel {
    match assets.get(id) {
        Ok(model) => model.clone(),
        Err(err) => {
            tracing::warn!(%err, "falling back to a unit box model");
            PhysicsModel::single_box(Vec3::splat(0.5))
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    tracing::info!("Strata Engine v{}", strata_core::VERSION);

    let settings = Settings::load_or_default("strata.json");
    tracing::debug!(?settings, "runtime settings");

    let mut app = App::new();
    app.use_module(WorldModule::new(build_world(&settings)?));
    app.use_module(PhysicsModule::new(SimConfig::default(), settings.physics_rate_hz));
    spawn_demo_scene(&mut app);

    let mut ticker = Ticker::from_hz(settings.frame_rate_hz);
    for frame in 0..settings.demo_frames {
        app.tick()?;
        if frame % settings.frame_rate_hz as u64 == 0 {
            report(&mut app, frame);
        }
        ticker.wait();
    }

    shutdown_physics(&mut app);
    tracing::info!("demo complete");
    Ok(())
}

fn report(app: &mut App, frame: u64) {
    let mut lowest = f32::INFINITY;
    let mut highest = f32::NEG_INFINITY;
    let mut count = 0;
    for (_, (transform, _)) in app.store_mut().query::<(&mut Transform, &mut RigidBody)>() {
        lowest = lowest.min(transform.position.y);
        highest = highest.max(transform.position.y);
        count += 1;
    }
    tracing::info!(frame, bodies = count, lowest, highest, "simulation state");
}
