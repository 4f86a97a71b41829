// Behavioural scenarios for the fixed-rate simulator: freefall, settling
// on the streamed world, entity-entity stacking, sleeping, and the
// robustness guards around bad input.

use glam::{IVec3, Quat, Vec3};
use strata_core::EntityId;
use strata_physics::{
    BodySnapshot, BodyState, PhysicsModel, PhysicsSnapshot, SimConfig, Simulation, WorldSlice,
};

fn entity(n: u32) -> EntityId {
    EntityId::from_bits((n as u64) << 32)
}

fn dynamic_box(id: u32, position: Vec3, velocity: Vec3, half: Vec3) -> BodySnapshot {
    BodySnapshot {
        entity: entity(id),
        position,
        orientation: Quat::IDENTITY,
        velocity,
        angular_velocity: Vec3::ZERO,
        is_static: false,
        sleeping: false,
        idle_time: 0.0,
        mass: 1.0,
        gravity_scale: 1.0,
        friction: 0.0,
        restitution: 0.0,
        model: PhysicsModel::single_box(half),
    }
}

fn static_box(id: u32, position: Vec3, half: Vec3) -> BodySnapshot {
    BodySnapshot {
        is_static: true,
        gravity_scale: 0.0,
        ..dynamic_box(id, position, Vec3::ZERO, half)
    }
}

fn no_gravity() -> SimConfig {
    SimConfig {
        gravity: Vec3::ZERO,
        ..SimConfig::default()
    }
}

fn result_of(sim: &Simulation, id: u32) -> strata_physics::BodyResult {
    sim.results()
        .bodies
        .iter()
        .copied()
        .find(|b| b.entity == entity(id))
        .expect("body present in results")
}

#[test]
fn gravity_freefall() {
    let config = SimConfig {
        gravity: Vec3::new(0.0, -10.0, 0.0),
        ..SimConfig::default()
    };
    let mut sim = Simulation::new(config);
    sim.apply_snapshot(PhysicsSnapshot {
        bodies: vec![dynamic_box(
            1,
            Vec3::new(0.0, 10.0, 0.0),
            Vec3::ZERO,
            Vec3::splat(0.5),
        )],
        world: None,
    });
    let dt = 1.0 / 60.0;
    for _ in 0..10 {
        sim.step(dt);
    }
    let after_ten = result_of(&sim, 1);
    assert!(after_ten.position.y < 10.0);
    assert!(after_ten.velocity.y < 0.0);

    for _ in 10..600 {
        sim.step(dt);
    }
    let after_ten_seconds = result_of(&sim, 1);
    // Per-tick damping caps the fall at the terminal velocity
    // v* = d * g * dt / (1 - d) with d = 0.98.
    let terminal = 0.98 * -10.0 * dt / (1.0 - 0.98);
    assert!((after_ten_seconds.velocity.y - terminal).abs() < 0.5);
    assert!(after_ten_seconds.position.y < after_ten.position.y);
}

#[test]
fn floor_stop_on_world_voxel() {
    // A single solid voxel at (0,0,0) with a one-metre grid; the falling
    // unit box must come to rest with its base on the voxel's top face.
    let mut world = WorldSlice::new(1.0);
    world.solids.insert(IVec3::ZERO);
    world.friction = 0.0;
    world.restitution = 0.0;

    let mut sim = Simulation::new(no_gravity());
    sim.apply_snapshot(PhysicsSnapshot {
        bodies: vec![dynamic_box(
            1,
            Vec3::new(0.0, 3.0, 0.0),
            Vec3::new(0.0, -10.0, 0.0),
            Vec3::splat(0.5),
        )],
        world: Some(world),
    });
    for _ in 0..20 {
        sim.step(0.1);
    }
    let body = result_of(&sim, 1);
    assert!(
        (1.485..=1.515).contains(&body.position.y),
        "resting height was {}",
        body.position.y
    );
    assert!(body.velocity.length() < 0.05);
}

#[test]
fn entity_entity_stack() {
    let mut sim = Simulation::new(no_gravity());
    sim.apply_snapshot(PhysicsSnapshot {
        bodies: vec![
            static_box(1, Vec3::ZERO, Vec3::splat(0.5)),
            dynamic_box(
                2,
                Vec3::new(0.0, 2.0, 0.0),
                Vec3::new(0.0, -10.0, 0.0),
                Vec3::splat(0.5),
            ),
        ],
        world: None,
    });
    for _ in 0..20 {
        sim.step(0.1);
    }
    let base = result_of(&sim, 1);
    let stacked = result_of(&sim, 2);
    assert_eq!(base.position, Vec3::ZERO, "static body must not move");
    assert!(
        (0.985..=1.11).contains(&stacked.position.y),
        "stacked height was {}",
        stacked.position.y
    );
}

#[test]
fn voxel_mode_stack() {
    // Two single-cell voxel models; the pair runs the precise narrow phase.
    let model = PhysicsModel::from_voxels(1.0, &[IVec3::ZERO]);
    let make = |id: u32, position: Vec3, velocity: Vec3, is_static: bool| BodySnapshot {
        entity: entity(id),
        position,
        orientation: Quat::IDENTITY,
        velocity,
        angular_velocity: Vec3::ZERO,
        is_static,
        sleeping: false,
        idle_time: 0.0,
        mass: 1.0,
        gravity_scale: 0.0,
        friction: 0.2,
        restitution: 0.0,
        model: model.clone(),
    };
    let mut sim = Simulation::new(no_gravity());
    sim.apply_snapshot(PhysicsSnapshot {
        bodies: vec![
            make(1, Vec3::ZERO, Vec3::ZERO, true),
            make(2, Vec3::new(0.0, 2.0, 0.0), Vec3::new(0.0, -5.0, 0.0), false),
        ],
        world: None,
    });
    for _ in 0..30 {
        sim.step(0.1);
    }
    let stacked = result_of(&sim, 2);
    assert!(
        (0.985..=1.05).contains(&stacked.position.y),
        "stacked height was {}",
        stacked.position.y
    );
    assert_eq!(sim.body_state(entity(2)), Some(BodyState::Sleeping));
}

#[test]
fn low_velocity_body_falls_asleep() {
    let config = SimConfig {
        gravity: Vec3::ZERO,
        sleep_threshold: 0.1,
        sleep_time: 0.2,
        ..SimConfig::default()
    };
    let mut sim = Simulation::new(config);
    sim.apply_snapshot(PhysicsSnapshot {
        bodies: vec![dynamic_box(
            1,
            Vec3::ZERO,
            Vec3::new(0.05, 0.0, 0.0),
            Vec3::splat(0.5),
        )],
        world: None,
    });
    for _ in 0..5 {
        sim.step(0.1);
    }
    let body = result_of(&sim, 1);
    assert!(body.sleeping);
    assert_eq!(body.velocity, Vec3::ZERO);
    assert_eq!(sim.body_state(entity(1)), Some(BodyState::Sleeping));
}

#[test]
fn empty_snapshot_empties_the_table() {
    let mut sim = Simulation::new(SimConfig::default());
    sim.apply_snapshot(PhysicsSnapshot {
        bodies: vec![dynamic_box(1, Vec3::ZERO, Vec3::ZERO, Vec3::splat(0.5))],
        world: None,
    });
    sim.step(1.0 / 60.0);
    assert_eq!(sim.body_count(), 1);

    sim.apply_snapshot(PhysicsSnapshot::default());
    sim.step(1.0 / 60.0);
    let results = sim.results();
    assert!(results.bodies.is_empty(), "no spurious bodies may appear");
}

#[test]
fn static_body_passes_through_unchanged() {
    let position = Vec3::new(3.0, -2.0, 7.5);
    let mut sim = Simulation::new(SimConfig::default());
    sim.apply_snapshot(PhysicsSnapshot {
        bodies: vec![static_box(1, position, Vec3::splat(2.0))],
        world: None,
    });
    for _ in 0..50 {
        sim.step(1.0 / 60.0);
    }
    let body = result_of(&sim, 1);
    assert_eq!(body.position, position);
    assert_eq!(body.orientation, Quat::IDENTITY);
    assert_eq!(sim.body_state(entity(1)), Some(BodyState::Static));
}

#[test]
fn oversized_time_step_skips_integration() {
    let mut sim = Simulation::new(SimConfig::default());
    sim.apply_snapshot(PhysicsSnapshot {
        bodies: vec![dynamic_box(
            1,
            Vec3::new(0.0, 5.0, 0.0),
            Vec3::new(0.0, -100.0, 0.0),
            Vec3::splat(0.5),
        )],
        world: None,
    });
    sim.step(1.5);
    let body = result_of(&sim, 1);
    assert_eq!(body.position, Vec3::new(0.0, 5.0, 0.0));
}

#[test]
fn non_finite_velocity_resets_instead_of_poisoning() {
    let mut sim = Simulation::new(no_gravity());
    sim.apply_snapshot(PhysicsSnapshot {
        bodies: vec![dynamic_box(
            1,
            Vec3::ZERO,
            Vec3::new(f32::NAN, 0.0, 0.0),
            Vec3::splat(0.5),
        )],
        world: None,
    });
    sim.step(0.1);
    let body = result_of(&sim, 1);
    assert!(body.position.is_finite());
    assert_eq!(body.velocity, Vec3::ZERO);
}

#[test]
fn sleeping_body_wakes_when_struck() {
    let mut sleeper = dynamic_box(1, Vec3::ZERO, Vec3::ZERO, Vec3::splat(0.5));
    sleeper.sleeping = true;
    sleeper.idle_time = 10.0;
    let striker = dynamic_box(
        2,
        Vec3::new(-3.0, 0.0, 0.0),
        Vec3::new(6.0, 0.0, 0.0),
        Vec3::splat(0.5),
    );
    let mut sim = Simulation::new(no_gravity());
    sim.apply_snapshot(PhysicsSnapshot {
        bodies: vec![sleeper, striker],
        world: None,
    });
    for _ in 0..40 {
        sim.step(0.1);
    }
    let woken = result_of(&sim, 1);
    assert!(
        woken.position.x > 0.01 || woken.velocity.x > 0.01,
        "struck sleeper must move"
    );
}
