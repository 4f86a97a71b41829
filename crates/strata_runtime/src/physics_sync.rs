// physics_sync.rs - Main-thread side of the physics exchange
//
// Runs in Update. Applies the latest results to entities that still carry
// the full physics component set, then publishes a fresh snapshot of every
// physical entity together with a world slice sampled around the dynamic
// bodies. Both directions go through the single-slot mailboxes; skipped
// intermediates are expected.

use crate::components::Transform;
use crate::modules::PhysicsLink;
use std::sync::Arc;
use strata_core::math::Aabb;
use strata_core::SystemCtx;
use strata_physics::{
    BodySnapshot, Collider, Obb, PhysicsModel, PhysicsSnapshot, RigidBody, WorldSlice,
};

pub fn physics_sync(ctx: &mut SystemCtx) {
    let Some(link) = ctx.resource::<PhysicsLink>() else {
        return;
    };
    let proxy = Arc::clone(&link.proxy);

    // 1. Latest results -> entity store. Entities that lost a physics
    //    component since the snapshot are skipped.
    if let Some(results) = proxy.take_results() {
        for result in results.bodies {
            let store = ctx.store();
            let Some(offset) = store
                .get_component::<PhysicsModel>(result.entity)
                .map(|model| result.orientation * model.center_offset)
            else {
                continue;
            };
            if store.get_component::<RigidBody>(result.entity).is_none() {
                continue;
            }
            let Some(transform) = store.get_component_mut::<Transform>(result.entity) else {
                continue;
            };
            transform.position = result.position - offset;
            transform.rotation = result.orientation;
            let Some(body) = store.get_component_mut::<RigidBody>(result.entity) else {
                continue;
            };
            body.velocity = result.velocity;
            body.angular_velocity = result.angular_velocity;
            body.sleeping = result.sleeping;
            body.idle_time = result.idle_time;
        }
    }

    // 2. Fresh snapshot of every entity carrying the full physics set.
    let mut snapshot = PhysicsSnapshot::default();
    for (entity, (transform, body, model, collider)) in
        ctx.query::<(&mut Transform, &mut RigidBody, &mut PhysicsModel, &mut Collider)>()
    {
        snapshot.bodies.push(BodySnapshot {
            entity,
            position: transform.position + transform.rotation * model.center_offset,
            orientation: transform.rotation,
            velocity: body.velocity,
            angular_velocity: body.angular_velocity,
            is_static: body.is_static,
            sleeping: body.sleeping,
            idle_time: body.idle_time,
            mass: body.mass,
            gravity_scale: body.gravity_scale,
            friction: collider.friction,
            restitution: collider.restitution,
            model: model.clone(),
        });
    }

    // 3. Solid world voxels around the dynamic bodies, so the simulator
    //    collides against the streamed world without the world lock.
    if let Some(world) = crate::modules::world_query(ctx) {
        let mut slice = WorldSlice::new(world.voxel_size());
        let margin = 2.0 * world.voxel_size();
        world.with_map(|map| {
            for body in snapshot.bodies.iter().filter(|b| !b.is_static) {
                let reach = margin + body.velocity.length() * 0.1;
                for cell in map.solids_in(body_bounds(body).expand(reach)) {
                    slice.solids.insert(cell);
                }
            }
        });
        snapshot.world = Some(slice);
    }

    proxy.publish_snapshot(snapshot);
}

fn body_bounds(body: &BodySnapshot) -> Aabb {
    let mut bounds = Aabb::new(body.position, body.position);
    for model_box in &body.model.boxes {
        let world_box = Obb::new(
            body.position + body.orientation * model_box.offset,
            model_box.half_extents,
            body.orientation,
        );
        bounds = bounds.union(&world_box.aabb());
    }
    // Degenerate models still sample their immediate surroundings.
    if body.model.boxes.is_empty() {
        bounds = bounds.expand(0.5);
    }
    bounds
}
