// sim.rs - Fixed-rate rigid-body simulator
//
// The body table lives across ticks and is only ever replaced through
// snapshots, never mutated mid-tick from outside, so a tick is
// deterministic given a snapshot and the previous table. Bad input never
// kills the loop: a non-finite displacement resets the body's velocities
// and the tick continues.

use crate::collide::{pair_contact, world_contact};
use crate::model::PhysicsModel;
use crate::sat::{Contact, Obb};
use crate::snapshot::{BodyResult, BodySnapshot, PhysicsResults, PhysicsSnapshot, WorldSlice};
use glam::{IVec3, Quat, Vec3};
use std::collections::HashSet;
use strata_core::math::Aabb;
use strata_core::EntityId;

/// Simulation tuning. The 1 cm `slop` keeps resting penetration inside the
/// tolerance the settling behaviours are specified with.
#[derive(Clone, Copy, Debug)]
pub struct SimConfig {
    pub gravity: Vec3,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub slop: f32,
    pub sleep_threshold: f32,
    pub sleep_time: f32,
    /// Restitution is suppressed when `v_rel . n > -cutoff`; low-energy
    /// contacts settle instead of jittering.
    pub restitution_cutoff: f32,
    /// A resolved collision with `|v_rel . n|` above this wakes both bodies.
    pub wake_speed: f32,
    /// Manifold reduction keeps contacts this close to the deepest one.
    pub manifold_tolerance: f32,
    pub velocity_clamp: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.81, 0.0),
            linear_damping: 0.98,
            angular_damping: 0.95,
            slop: 0.01,
            sleep_threshold: 0.1,
            sleep_time: 0.5,
            restitution_cutoff: 0.5,
            wake_speed: 0.1,
            manifold_tolerance: 0.01,
            velocity_clamp: 0.01,
        }
    }
}

/// Per-body lifecycle state.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BodyState {
    Active,
    Sleeping,
    /// Terminal per body; `wake` is a no-op.
    Static,
}

pub(crate) struct InternalBody {
    pub entity: EntityId,
    pub position: Vec3,
    pub orientation: Quat,
    pub velocity: Vec3,
    pub angular_velocity: Vec3,
    pub is_static: bool,
    pub sleeping: bool,
    pub idle_time: f32,
    pub gravity_scale: f32,
    pub friction: f32,
    pub restitution: f32,
    pub inv_mass: f32,
    pub inv_inertia: f32,
    pub model: PhysicsModel,
    /// Occupied cells in the transform-origin grid (precise mode only).
    pub occupied: HashSet<IVec3>,
    /// World-space boxes and their enclosing bounds, rebuilt on every move.
    pub world_boxes: Vec<Obb>,
    pub aabb: Aabb,
}

impl InternalBody {
    fn from_snapshot(snap: BodySnapshot) -> Self {
        let (inv_mass, inv_inertia) = if snap.is_static || snap.mass <= 0.0 {
            (0.0, 0.0)
        } else {
            (1.0 / snap.mass, inverse_inertia(&snap.model, snap.mass))
        };
        let occupied = snap
            .model
            .voxels
            .iter()
            .map(|v| snap.model.grid_coord(v))
            .collect();
        let mut body = Self {
            entity: snap.entity,
            position: snap.position,
            orientation: snap.orientation.normalize(),
            velocity: snap.velocity,
            angular_velocity: snap.angular_velocity,
            is_static: snap.is_static,
            sleeping: snap.sleeping,
            idle_time: snap.idle_time,
            gravity_scale: snap.gravity_scale,
            friction: snap.friction,
            restitution: snap.restitution,
            inv_mass,
            inv_inertia,
            model: snap.model,
            occupied,
            world_boxes: Vec::new(),
            aabb: Aabb::new(snap.position, snap.position),
        };
        body.refresh_world_geometry();
        body
    }

    pub(crate) fn has_voxels(&self) -> bool {
        !self.occupied.is_empty()
    }

    pub(crate) fn refresh_world_geometry(&mut self) {
        self.world_boxes.clear();
        for model_box in &self.model.boxes {
            self.world_boxes.push(Obb::new(
                self.position + self.orientation * model_box.offset,
                model_box.half_extents,
                self.orientation,
            ));
        }
        let mut bounds = Aabb::new(self.position, self.position);
        for world_box in &self.world_boxes {
            bounds = bounds.union(&world_box.aabb());
        }
        self.aabb = bounds;
    }

    fn wake(&mut self) {
        if self.is_static {
            return;
        }
        self.sleeping = false;
        self.idle_time = 0.0;
    }

    fn is_active(&self) -> bool {
        !self.is_static && !self.sleeping
    }

    fn state(&self) -> BodyState {
        if self.is_static {
            BodyState::Static
        } else if self.sleeping {
            BodyState::Sleeping
        } else {
            BodyState::Active
        }
    }
}

/// Scalar inertia: `m * avg_side^2 / 6` per box, combined across boxes by
/// the parallel-axis theorem under uniform density.
fn inverse_inertia(model: &PhysicsModel, mass: f32) -> f32 {
    let total_volume: f32 = model
        .boxes
        .iter()
        .map(|b| 8.0 * b.half_extents.x * b.half_extents.y * b.half_extents.z)
        .sum();
    if total_volume <= 0.0 {
        return 0.0;
    }
    let mut inertia = 0.0;
    for model_box in &model.boxes {
        let volume = 8.0 * model_box.half_extents.x * model_box.half_extents.y * model_box.half_extents.z;
        let box_mass = mass * volume / total_volume;
        let avg_side = 2.0 * (model_box.half_extents.x + model_box.half_extents.y + model_box.half_extents.z) / 3.0;
        inertia += box_mass * avg_side * avg_side / 6.0
            + box_mass * model_box.offset.length_squared();
    }
    if inertia > 0.0 {
        1.0 / inertia
    } else {
        0.0
    }
}

pub struct Simulation {
    config: SimConfig,
    bodies: Vec<InternalBody>,
    world: Option<WorldSlice>,
    tick: u64,
}

impl Simulation {
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            bodies: Vec::new(),
            world: None,
            tick: 0,
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Replace the body table with the snapshot's: every published body is
    /// upserted wholesale, bodies absent from the snapshot are deleted.
    pub fn apply_snapshot(&mut self, snapshot: PhysicsSnapshot) {
        self.bodies = snapshot
            .bodies
            .into_iter()
            .map(InternalBody::from_snapshot)
            .collect();
        self.world = snapshot.world;
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn body_state(&self, entity: EntityId) -> Option<BodyState> {
        self.bodies
            .iter()
            .find(|b| b.entity == entity)
            .map(|b| b.state())
    }

    /// One fixed-rate tick. Oversized steps are clamped away entirely.
    pub fn step(&mut self, dt: f32) {
        self.tick += 1;
        if dt > 1.0 {
            tracing::warn!(dt, "time step over one second; skipping integration");
            return;
        }
        if dt <= 0.0 {
            return;
        }

        for body in &mut self.bodies {
            integrate(body, &self.config, dt);
        }

        // Pairwise collisions. A sleeping body still participates when the
        // other side is active, so a resting stack can be knocked over.
        let count = self.bodies.len();
        for i in 0..count {
            for j in (i + 1)..count {
                if !self.bodies[i].is_active() && !self.bodies[j].is_active() {
                    continue;
                }
                if !self.bodies[i].aabb.intersects(&self.bodies[j].aabb) {
                    continue;
                }
                if let Some(contact) =
                    pair_contact(&self.bodies[i], &self.bodies[j], self.config.manifold_tolerance)
                {
                    Self::resolve_pair(&mut self.bodies, i, j, contact, &self.config);
                }
            }
        }

        // Contacts against the streamed world.
        if let Some(world) = &self.world {
            for body in &mut self.bodies {
                if !body.is_active() {
                    continue;
                }
                if let Some(contact) = world_contact(body, world, self.config.manifold_tolerance) {
                    resolve_world(body, contact, world, &self.config);
                }
            }
        }

        for body in &mut self.bodies {
            settle(body, &self.config, dt);
        }
    }

    /// Closest body hit by a ray, as `(entity, distance)`. Useful for
    /// picking and shooting queries against the simulator's own state.
    pub fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<(EntityId, f32)> {
        let direction = direction.normalize_or_zero();
        if direction == Vec3::ZERO {
            return None;
        }
        let mut best: Option<(EntityId, f32)> = None;
        for body in &self.bodies {
            for world_box in &body.world_boxes {
                let Some(distance) = crate::sat::ray_obb(origin, direction, world_box) else {
                    continue;
                };
                if distance <= max_distance && best.map_or(true, |(_, d)| distance < d) {
                    best = Some((body.entity, distance));
                }
            }
        }
        best
    }

    /// Results for every internal body, sleeping or not.
    pub fn results(&self) -> PhysicsResults {
        PhysicsResults {
            bodies: self
                .bodies
                .iter()
                .map(|body| BodyResult {
                    entity: body.entity,
                    position: body.position,
                    orientation: body.orientation,
                    velocity: body.velocity,
                    angular_velocity: body.angular_velocity,
                    sleeping: body.sleeping,
                    idle_time: body.idle_time,
                })
                .collect(),
            tick: self.tick,
        }
    }

    fn resolve_pair(
        bodies: &mut [InternalBody],
        i: usize,
        j: usize,
        contact: Contact,
        config: &SimConfig,
    ) {
        let (a, b) = pair_mut(bodies, i, j);
        let normal = contact.normal; // pushes `a` away from `b`

        // Static position correction, split by inverse mass.
        let correction = (contact.penetration - config.slop).max(0.0);
        let inv_sum = a.inv_mass + b.inv_mass;
        if correction > 0.0 && inv_sum > 0.0 {
            a.position += normal * (correction * a.inv_mass / inv_sum);
            b.position -= normal * (correction * b.inv_mass / inv_sum);
        }

        let r_a = contact.point - a.position;
        let r_b = contact.point - b.position;
        let relative = (a.velocity + a.angular_velocity.cross(r_a))
            - (b.velocity + b.angular_velocity.cross(r_b));
        let vn = relative.dot(normal);
        if vn < 0.0 {
            let restitution = if vn > -config.restitution_cutoff {
                0.0
            } else {
                0.5 * (a.restitution + b.restitution)
            };
            let denom = a.inv_mass
                + b.inv_mass
                + r_a.cross(normal).length_squared() * a.inv_inertia
                + r_b.cross(normal).length_squared() * b.inv_inertia;
            if denom > 0.0 {
                let magnitude = -(1.0 + restitution) * vn / denom;
                let impulse = normal * magnitude;
                a.velocity += impulse * a.inv_mass;
                a.angular_velocity += r_a.cross(impulse) * a.inv_inertia;
                b.velocity -= impulse * b.inv_mass;
                b.angular_velocity -= r_b.cross(impulse) * b.inv_inertia;

                let tangential = relative - normal * vn;
                if tangential.length_squared() > 1e-8 {
                    let tangent = tangential.normalize();
                    let friction = 0.5 * (a.friction + b.friction);
                    let mut jt = -relative.dot(tangent) / denom;
                    jt = jt.clamp(-friction * magnitude.abs(), friction * magnitude.abs());
                    let friction_impulse = tangent * jt;
                    a.velocity += friction_impulse * a.inv_mass;
                    a.angular_velocity += r_a.cross(friction_impulse) * a.inv_inertia;
                    b.velocity -= friction_impulse * b.inv_mass;
                    b.angular_velocity -= r_b.cross(friction_impulse) * b.inv_inertia;
                }

                if vn.abs() > config.wake_speed {
                    a.wake();
                    b.wake();
                }
            }
        }

        a.refresh_world_geometry();
        b.refresh_world_geometry();
    }
}

fn integrate(body: &mut InternalBody, config: &SimConfig, dt: f32) {
    if !body.is_active() {
        return;
    }
    body.velocity += config.gravity * body.gravity_scale * dt;
    body.velocity *= config.linear_damping;
    body.angular_velocity *= config.angular_damping;

    let displacement = body.velocity * dt;
    if displacement.is_finite() {
        body.position += displacement;
    } else {
        tracing::warn!(entity = %body.entity, "non-finite displacement; velocity reset");
        body.velocity = Vec3::ZERO;
        body.angular_velocity = Vec3::ZERO;
    }

    let spin = body.angular_velocity;
    let speed_sq = spin.length_squared();
    if speed_sq > 0.0 && speed_sq.is_finite() {
        let speed = speed_sq.sqrt();
        let rotation = Quat::from_axis_angle(spin / speed, speed * dt);
        body.orientation = (rotation * body.orientation).normalize();
    }
    if !body.orientation.is_finite() {
        body.orientation = Quat::IDENTITY;
        body.angular_velocity = Vec3::ZERO;
    }
    body.refresh_world_geometry();
}

/// World contacts resolve against infinite mass and, deliberately, without
/// torque: a body resting on a partial voxel support stays put instead of
/// tipping off its own contact impulse.
fn resolve_world(body: &mut InternalBody, contact: Contact, world: &WorldSlice, config: &SimConfig) {
    let normal = contact.normal; // pushes the body out of the world
    let correction = (contact.penetration - config.slop).max(0.0);
    if correction > 0.0 && body.inv_mass > 0.0 {
        body.position += normal * correction;
    }

    let vn = body.velocity.dot(normal);
    if vn < 0.0 && body.inv_mass > 0.0 {
        let restitution = if vn > -config.restitution_cutoff {
            0.0
        } else {
            0.5 * (body.restitution + world.restitution)
        };
        let magnitude = -(1.0 + restitution) * vn / body.inv_mass;
        body.velocity += normal * (magnitude * body.inv_mass);

        let tangential = body.velocity - normal * body.velocity.dot(normal);
        if tangential.length_squared() > 1e-8 {
            let tangent = tangential.normalize();
            let friction = 0.5 * (body.friction + world.friction);
            let mut jt = -body.velocity.dot(tangent) / body.inv_mass;
            jt = jt.clamp(-friction * magnitude.abs(), friction * magnitude.abs());
            body.velocity += tangent * (jt * body.inv_mass);
        }

        if vn.abs() > config.wake_speed {
            body.wake();
        }
    }
    body.refresh_world_geometry();
}

fn settle(body: &mut InternalBody, config: &SimConfig, dt: f32) {
    if !body.is_active() {
        return;
    }
    if body.velocity.length() < config.velocity_clamp {
        body.velocity = Vec3::ZERO;
    }
    if body.angular_velocity.length() < config.velocity_clamp {
        body.angular_velocity = Vec3::ZERO;
    }
    if body.velocity.length() < config.sleep_threshold
        && body.angular_velocity.length() < config.sleep_threshold
    {
        body.idle_time += dt;
        if body.idle_time > config.sleep_time {
            body.sleeping = true;
            body.velocity = Vec3::ZERO;
            body.angular_velocity = Vec3::ZERO;
            tracing::trace!(entity = %body.entity, "body fell asleep");
        }
    } else {
        body.idle_time = 0.0;
    }
}

fn pair_mut(bodies: &mut [InternalBody], i: usize, j: usize) -> (&mut InternalBody, &mut InternalBody) {
    assert_ne!(i, j, "a body cannot collide with itself");
    if i < j {
        let (left, right) = bodies.split_at_mut(j);
        (&mut left[i], &mut right[0])
    } else {
        let (left, right) = bodies.split_at_mut(i);
        (&mut right[0], &mut left[j])
    }
}
