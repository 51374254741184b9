//! Ground detection against real Rapier3D geometry.
//!
//! Characters use the default body (radius 0.5, height 2) standing with the
//! capsule bottom on their origin, so the ground sweep reaches 0.53 below it.

#![cfg(feature = "rapier3d")]

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;
use capsule_character_controller::prelude::*;

/// Create a minimal test app with physics and character controller.
fn create_test_app() -> App {
    let mut app = App::new();

    app.add_plugins(MinimalPlugins);
    app.add_plugins(TransformPlugin);
    app.add_plugins(RapierPhysicsPlugin::<NoUserData>::default());
    app.add_plugins(CharacterControllerPlugin::<Rapier3dBackend>::default());
    // Fixed steps are driven by hand, never by elapsed real time
    app.insert_resource(Time::<Fixed>::from_seconds(3600.0));

    app.finish();
    app.cleanup();
    app
}

/// Spawn a static slab whose top face is at `top`.
fn spawn_ground(app: &mut App, top: f32) -> Entity {
    let transform = Transform::from_xyz(0.0, top - 0.5, 0.0);
    app.world_mut()
        .spawn((
            transform,
            GlobalTransform::from(transform),
            RigidBody::Fixed,
            Collider::cuboid(50.0, 0.5, 50.0),
        ))
        .id()
}

/// Spawn a static wall whose face at `face_x` looks toward -X.
fn spawn_wall(app: &mut App, face_x: f32, center_y: f32) -> Entity {
    let transform = Transform::from_xyz(face_x + 0.5, center_y, 0.0);
    app.world_mut()
        .spawn((
            transform,
            GlobalTransform::from(transform),
            RigidBody::Fixed,
            Collider::cuboid(0.5, 20.0, 50.0),
        ))
        .id()
}

/// Spawn a character with its capsule bottom at `position`.
fn spawn_character(app: &mut App, position: Vec3) -> Entity {
    let transform = Transform::from_translation(position);
    app.world_mut()
        .spawn((
            transform,
            GlobalTransform::from(transform),
            CharacterController::new(),
            Rapier3dCharacterBundle::new(),
        ))
        .id()
}

/// Let Rapier pick up the spawned colliders, then run one controller tick.
fn settle_and_tick(app: &mut App) {
    app.update();
    app.update();
    app.world_mut().run_schedule(FixedUpdate);
}

fn controller(app: &App, entity: Entity) -> &CharacterController {
    app.world()
        .get::<CharacterController>(entity)
        .expect("character has a controller")
}

#[test]
fn ground_half_a_unit_below_is_grounded() {
    let mut app = create_test_app();
    let ground = spawn_ground(&mut app, -0.5);
    let character = spawn_character(&mut app, Vec3::ZERO);

    settle_and_tick(&mut app);

    let state = *controller(&app, character).ground();
    println!("PROOF: ground={state:?}");

    assert!(state.is_grounded, "plane 0.5 below the capsule must be ground");
    assert_eq!(state.ground_entity(), Some(ground));
    let normal = state.ground_normal.unwrap_or(Vec3::ZERO);
    assert!(normal.dot(Vec3::Y) > 0.99, "flat ground normal points up: {normal:?}");
}

#[test]
fn ground_a_full_unit_below_is_not_grounded() {
    let mut app = create_test_app();
    spawn_ground(&mut app, -1.0);
    let character = spawn_character(&mut app, Vec3::ZERO);

    settle_and_tick(&mut app);

    let state = *controller(&app, character).ground();
    println!("PROOF: ground={state:?}");

    assert!(!state.is_grounded, "plane 1.0 below is out of reach");
    assert_eq!(state.ground_normal, None);
}

#[test]
fn wall_beside_the_capsule_is_not_ground() {
    let mut app = create_test_app();
    // Face just inside the capsule radius, no floor anywhere
    spawn_wall(&mut app, 0.49, 10.0);
    let character = spawn_character(&mut app, Vec3::new(0.0, 10.0, 0.0));

    settle_and_tick(&mut app);

    let state = *controller(&app, character).ground();
    println!("PROOF: ground={state:?}");

    assert!(!state.is_grounded, "a wall touching the capsule must not be ground");
    assert!(!state.on_slope);
    assert_eq!(state.ground_normal, None);

    let velocity = app
        .world()
        .get::<Velocity>(character)
        .map(|v| v.linvel)
        .unwrap_or(Vec3::NAN);
    assert!(velocity.y < -1.0, "character keeps falling: {velocity:?}");
}

#[test]
fn floor_is_found_past_a_touching_wall() {
    let mut app = create_test_app();
    let wall = spawn_wall(&mut app, 0.49, 0.0);
    let floor = spawn_ground(&mut app, -0.5);
    let character = spawn_character(&mut app, Vec3::ZERO);

    settle_and_tick(&mut app);

    let state = *controller(&app, character).ground();
    println!("PROOF: ground={state:?}");

    assert!(state.is_grounded, "floor below a character leaning on a wall is ground");
    assert_eq!(state.ground_entity(), Some(floor));
    assert_ne!(state.ground_entity(), Some(wall));
    let normal = state.ground_normal.unwrap_or(Vec3::ZERO);
    assert!(normal.dot(Vec3::Y) > 0.99, "floor normal points up: {normal:?}");
}

#[test]
fn sensors_are_not_ground() {
    let mut app = create_test_app();
    let transform = Transform::from_xyz(0.0, -0.5, 0.0);
    app.world_mut().spawn((
        transform,
        GlobalTransform::from(transform),
        Collider::cuboid(50.0, 0.5, 50.0),
        Sensor,
    ));
    let character = spawn_character(&mut app, Vec3::ZERO);

    settle_and_tick(&mut app);

    assert!(!controller(&app, character).is_grounded());
}

#[test]
fn layer_mask_filters_ground() {
    let mut app = create_test_app();
    let transform = Transform::from_xyz(0.0, -0.5, 0.0);
    app.world_mut().spawn((
        transform,
        GlobalTransform::from(transform),
        RigidBody::Fixed,
        Collider::cuboid(50.0, 0.5, 50.0),
        CollisionGroups::new(Group::GROUP_2, Group::ALL),
    ));

    let character_transform = Transform::default();
    let character = app
        .world_mut()
        .spawn((
            character_transform,
            GlobalTransform::from(character_transform),
            CharacterController::new()
                .with_caster(ShapeCaster::default().with_layer_mask(Group::GROUP_1.bits())),
            Rapier3dCharacterBundle::new(),
        ))
        .id();

    settle_and_tick(&mut app);

    assert!(
        !controller(&app, character).is_grounded(),
        "ground outside the layer mask must be skipped"
    );
}

#[test]
fn controller_builds_its_own_collider() {
    let mut app = create_test_app();
    let character = spawn_character(&mut app, Vec3::new(0.0, 5.0, 0.0));

    settle_and_tick(&mut app);

    let world = app.world();
    assert!(world.get::<Collider>(character).is_some());
    assert_eq!(world.get::<GravityScale>(character).map(|g| g.0), Some(0.0));
    assert!(matches!(
        world.get::<ColliderMassProperties>(character),
        Some(ColliderMassProperties::Mass(mass)) if *mass == 1.0
    ));
    assert_eq!(world.get::<Friction>(character).map(|f| f.coefficient), Some(0.0));
}

#[test]
fn controller_velocity_is_applied_to_body() {
    let mut app = create_test_app();
    spawn_ground(&mut app, -0.2);
    let character = spawn_character(&mut app, Vec3::ZERO);
    app.world_mut()
        .get_mut::<CharacterController>(character)
        .expect("character has a controller")
        .set_move(Vec3::new(3.0, 0.0, 0.0));

    settle_and_tick(&mut app);

    let velocity = app
        .world()
        .get::<Velocity>(character)
        .map(|v| v.linvel)
        .unwrap_or(Vec3::NAN);
    println!("PROOF: velocity={velocity:?}");
    assert_eq!(velocity, Vec3::new(3.0, -10.0, 0.0));
}
