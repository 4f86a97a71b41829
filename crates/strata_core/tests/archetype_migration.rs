// Cross-module behaviour of the entity store and scheduler: archetype
// migration, command-flush visibility, and the identity laws.

use strata_core::{spawn, App, EcsError, EntityStore, Stage};

#[derive(Clone, Copy, Debug, PartialEq)]
struct A {
    x: i32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct B {
    y: i32,
}

fn store() -> EntityStore {
    let mut store = EntityStore::new();
    store.register_component::<A>();
    store.register_component::<B>();
    store
}

#[test]
fn archetype_migration_scenario() {
    let mut store = store();
    let id = spawn!(store, A { x: 1 }).unwrap();

    store.add_components(id, (B { y: 2 },)).unwrap();
    let rows: Vec<_> = store
        .query::<(&mut A, &mut B)>()
        .map(|(e, (a, b))| (e, *a, *b))
        .collect();
    assert_eq!(rows, vec![(id, A { x: 1 }, B { y: 2 })]);

    store.remove_components::<(B,)>(id).unwrap();
    assert_eq!(store.query::<(&mut A, &mut B)>().count(), 0);
    let rows: Vec<_> = store.query::<(&mut A,)>().map(|(e, (a,))| (e, *a)).collect();
    assert_eq!(rows, vec![(id, A { x: 1 })]);
}

#[test]
fn get_all_components_matches_archetype_key() {
    let mut store = store();
    let a_id = store.registry().lookup::<A>().unwrap();
    let b_id = store.registry().lookup::<B>().unwrap();
    let id = store.add_entity((B { y: 1 }, A { x: 2 })).unwrap();
    let mut ids = store.get_all_components(id).unwrap().to_vec();
    ids.sort_unstable();
    let mut expected = vec![a_id, b_id];
    expected.sort_unstable();
    assert_eq!(ids, expected);
}

#[test]
fn mutating_a_dead_entity_is_entity_not_found() {
    let mut store = store();
    let id = store.add_entity((A { x: 1 },)).unwrap();
    store.remove_entity(id).unwrap();
    assert!(matches!(
        store.add_components(id, (B { y: 1 },)),
        Err(EcsError::EntityNotFound(_))
    ));
    assert!(matches!(
        store.get_all_components(id),
        Err(EcsError::EntityNotFound(_))
    ));
}

#[test]
fn commands_batch_is_visible_to_the_next_system() {
    let mut app = App::new();
    app.register_component::<A>();
    app.register_component::<B>();

    app.use_system("spawner", |ctx| {
        if ctx.store().live_entities() == 0 {
            let id = ctx.commands().add_entity((A { x: 1 },));
            ctx.commands().add_components(id, (B { y: 2 },));
        }
    })
    .in_stage(Stage::PreUpdate);

    app.use_system("observer", |ctx| {
        let seen: Vec<(A, B)> = ctx
            .query::<(&mut A, &mut B)>()
            .map(|(_, (a, b))| (*a, *b))
            .collect();
        assert_eq!(seen, vec![(A { x: 1 }, B { y: 2 })]);
    })
    .in_stage(Stage::Update);

    app.tick().unwrap();
}
