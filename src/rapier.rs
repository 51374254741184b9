//! Rapier3D physics backend implementation.
//!
//! This module provides the physics backend for Bevy Rapier3D.
//! Enable with the `rapier3d` feature.

use bevy::ecs::system::SystemState;
use bevy::prelude::*;
use bevy_rapier3d::geometry::Group;
use bevy_rapier3d::prelude::*;

use crate::backend::{CharacterPhysicsBackend, GroundCastRequest};
use crate::collision::CollisionData;
use crate::config::{BodyParams, CapsuleShape};
use crate::controller::CharacterController;
use crate::systems::controller_frames;

/// Rapier3D physics backend for the character controller.
///
/// This backend uses `bevy_rapier3d` for velocity, collider and rigid body
/// updates. Ground detection is handled by a dedicated Rapier system that
/// reads the `RapierContext` through a cached system state.
pub struct Rapier3dBackend;

impl CharacterPhysicsBackend for Rapier3dBackend {
    fn plugin() -> impl Plugin {
        Rapier3dBackendPlugin
    }

    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec3) {
        if let Some(mut vel) = world.get_mut::<Velocity>(entity) {
            vel.linvel = velocity;
        }
    }

    fn get_position(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<GlobalTransform>(entity)
            .map(|t| t.translation())
            .or_else(|| world.get::<Transform>(entity).map(|t| t.translation))
            .unwrap_or(Vec3::ZERO)
    }

    fn get_up(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<GlobalTransform>(entity)
            .map(|t| *t.up())
            .unwrap_or(Vec3::Y)
    }

    fn get_gravity(world: &mut World) -> Vec3 {
        world
            .query::<&RapierConfiguration>()
            .iter(world)
            .next()
            .map(|config| config.gravity)
            .unwrap_or(Vec3::new(0.0, -9.81, 0.0))
    }

    fn apply_shape(world: &mut World, entity: Entity, shape: &CapsuleShape) {
        let Ok(mut entity_mut) = world.get_entity_mut(entity) else {
            return;
        };

        entity_mut.insert(capsule_collider(shape));

        // Zero-friction material, only if none was assigned
        if !entity_mut.contains::<Friction>() {
            entity_mut.insert(Friction {
                coefficient: 0.0,
                combine_rule: CoefficientCombineRule::Min,
            });
        }
        if !entity_mut.contains::<Restitution>() {
            entity_mut.insert(Restitution {
                coefficient: 0.0,
                combine_rule: CoefficientCombineRule::Min,
            });
        }
    }

    fn apply_body(world: &mut World, entity: Entity, params: &BodyParams) {
        let Ok(mut entity_mut) = world.get_entity_mut(entity) else {
            return;
        };

        entity_mut.insert((
            ColliderMassProperties::Mass(params.mass),
            Damping {
                linear_damping: params.linear_drag,
                angular_damping: params.angular_drag,
            },
            GravityScale(if params.use_gravity { 1.0 } else { 0.0 }),
            if params.kinematic {
                RigidBody::KinematicVelocityBased
            } else {
                RigidBody::Dynamic
            },
            if params.freeze_rotation {
                LockedAxes::ROTATION_LOCKED
            } else {
                LockedAxes::empty()
            },
        ));
    }
}

/// Build the collider for a capsule shape.
///
/// The capsule is wrapped in a compound so its centre offset is honoured
/// without moving the body origin.
pub fn capsule_collider(shape: &CapsuleShape) -> Collider {
    Collider::compound(vec![(
        shape.center,
        Quat::IDENTITY,
        Collider::capsule_y(shape.half_segment(), shape.radius),
    )])
}

/// Plugin that sets up Rapier3D-specific systems for the character controller.
pub struct Rapier3dBackendPlugin;

impl Plugin for Rapier3dBackendPlugin {
    fn build(&self, app: &mut App) {
        use crate::CharacterControllerSet;

        // Preparation - flag colliders/bodies the controller does not own
        app.add_systems(
            FixedUpdate,
            validate_collider_ownership.in_set(CharacterControllerSet::Preparation),
        );

        // Sensors - Rapier-specific ground detection
        app.add_systems(
            FixedUpdate,
            rapier_ground_detection.in_set(CharacterControllerSet::Sensors),
        );
    }
}

/// Colliders overlapping the sphere at the start of a sweep that can be
/// skipped before giving up.
const MAX_SKIPPED_CONTACTS: usize = 4;

/// Sweep a sphere through a Rapier query context.
///
/// Sensors are skipped, the requesting body is excluded and the layer mask is
/// applied as the query's collision filter. A collider the sphere starts in
/// contact with is skipped when its surface does not face the sweep (a wall
/// beside the capsule), and the sweep is repeated without it.
pub fn rapier_cast_sphere(
    context: &RapierContext,
    request: &GroundCastRequest,
) -> Option<CollisionData> {
    let shape = Collider::ball(request.radius);
    let options = ShapeCastOptions {
        max_time_of_impact: request.max_distance,
        stop_at_penetration: true,
        compute_impact_geometry_on_penetration: true,
        ..default()
    };
    let mut skipped: Vec<Entity> = Vec::new();

    loop {
        let not_skipped = |entity: Entity| !skipped.contains(&entity);
        let mut filter = QueryFilter::default()
            .exclude_sensors()
            .groups(CollisionGroups::new(
                Group::ALL,
                Group::from_bits_truncate(request.layer_mask),
            ))
            .predicate(&not_skipped);
        if let Some(entity) = request.exclude {
            filter = filter.exclude_rigid_body(entity).exclude_collider(entity);
        }

        let (hit_entity, hit) = context.cast_shape(
            request.origin,
            Quat::IDENTITY,
            request.direction,
            &shape,
            options,
            filter,
        )?;

        let normal = hit
            .details
            .map(|d| d.normal1)
            .unwrap_or(-request.direction);
        let started_in_contact = hit.time_of_impact <= f32::EPSILON;
        if started_in_contact
            && !request.faces(normal)
            && skipped.len() < MAX_SKIPPED_CONTACTS
        {
            skipped.push(hit_entity);
            continue;
        }

        let point = request.center_at(hit.time_of_impact) - normal * request.radius;
        return Some(CollisionData::new(
            hit.time_of_impact,
            normal,
            point,
            Some(hit_entity),
        ));
    }
}

/// Rapier-specific ground detection system.
///
/// Body frames come from [`Rapier3dBackend::get_position`] and
/// [`Rapier3dBackend::get_up`]; casts run against a read-only snapshot of the
/// Rapier context and are applied to the controllers afterwards.
fn rapier_ground_detection(
    world: &mut World,
    rapier_state: &mut SystemState<ReadRapierContext<'static, 'static>>,
) {
    let frames = controller_frames::<Rapier3dBackend>(world);

    let hits: Vec<(Entity, Option<CollisionData>, Vec3)> = {
        let world: &World = world;
        let rapier_context = rapier_state.get(world);
        let Ok(context) = rapier_context.single() else {
            return;
        };
        let caster = |request: &GroundCastRequest| rapier_cast_sphere(&context, request);

        frames
            .into_iter()
            .filter_map(|(entity, position, up)| {
                let controller = world.get::<CharacterController>(entity)?;
                Some((entity, controller.cast_ground(&caster, position, up), up))
            })
            .collect()
    };

    for (entity, hit, up) in hits {
        if let Some(mut controller) = world.get_mut::<CharacterController>(entity) {
            controller.apply_ground_hit(hit, up);
        }
    }
}

/// Check newly added controllers for colliders and bodies they do not own.
///
/// Extra rigid bodies on children are removed. Extra colliders are reported
/// and left in place.
fn validate_collider_ownership(
    mut commands: Commands,
    q_added: Query<(Entity, &Children), Added<CharacterController>>,
    q_parts: Query<(Has<Collider>, Has<RigidBody>)>,
) {
    for (entity, children) in &q_added {
        let children: &[Entity] = children;
        for &child in children {
            let Ok((has_collider, has_body)) = q_parts.get(child) else {
                continue;
            };

            if has_body {
                warn!("character {entity}: removing extra rigid body from child {child}");
                commands.entity(child).remove::<RigidBody>();
            }
            if has_collider {
                error!(
                    "character {entity}: child {child} carries an extra collider; \
                     the controller only manages its own capsule"
                );
            }
        }
    }
}

/// Bundle for creating a character with Rapier3D physics.
///
/// This bundle provides the Rapier3D components a character controller entity
/// needs. The collider itself is created from the controller's
/// [`BodyConfig`](crate::config::BodyConfig) on the first physics tick, so do
/// not add one yourself.
///
/// # Example
///
/// ```ignore
/// use bevy::prelude::*;
/// use capsule_character_controller::prelude::*;
///
/// fn spawn_player(mut commands: Commands) {
///     commands.spawn((
///         Transform::from_xyz(0.0, 1.0, 0.0),
///         CharacterController::new(),
///         Rapier3dCharacterBundle::new(),
///     ));
/// }
/// ```
///
/// # Defaults
///
/// - `rigid_body`: [`RigidBody::Dynamic`]
/// - `velocity`: Zero velocity (written every tick by the controller)
/// - `locked_axes`: [`LockedAxes::ROTATION_LOCKED`]
/// - `gravity_scale`: 0 (the controller applies gravity itself)
/// - `damping`: Linear 0, Angular 0.05
/// - `ccd`: Disabled
#[derive(Bundle, Default)]
pub struct Rapier3dCharacterBundle {
    /// The rigid body type. Should stay [`RigidBody::Dynamic`] for characters.
    pub rigid_body: RigidBody,
    /// Current linear and angular velocity.
    pub velocity: Velocity,
    /// Which axes are locked.
    pub locked_axes: LockedAxes,
    /// Backend gravity multiplier.
    pub gravity_scale: GravityScale,
    /// Damping coefficients for velocity reduction.
    pub damping: Damping,
    /// Continuous collision detection against fast-moving tunneling.
    pub ccd: Ccd,
}

impl Rapier3dCharacterBundle {
    /// Create a new character bundle.
    pub fn new() -> Self {
        Self {
            rigid_body: RigidBody::Dynamic,
            velocity: Velocity::default(),
            locked_axes: LockedAxes::ROTATION_LOCKED,
            gravity_scale: GravityScale(0.0),
            damping: Damping {
                linear_damping: 0.0,
                angular_damping: 0.05,
            },
            ccd: Ccd::disabled(),
        }
    }

    /// Enable continuous collision detection.
    pub fn with_ccd(mut self) -> Self {
        self.ccd = Ccd::enabled();
        self
    }

    /// Set the damping coefficients.
    ///
    /// Overwritten by the controller's body settings on the first tick.
    pub fn with_damping(mut self, linear: f32, angular: f32) -> Self {
        self.damping = Damping {
            linear_damping: linear,
            angular_damping: angular,
        };
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CharacterControllerPlugin;

    fn create_test_app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.add_plugins(TransformPlugin);
        app.add_plugins(RapierPhysicsPlugin::<NoUserData>::default());
        app.insert_resource(Time::<Fixed>::from_hz(60.0));
        app
    }

    #[test]
    fn rapier_backend_get_position() {
        let mut app = create_test_app();

        let entity = app
            .world_mut()
            .spawn((Transform::from_xyz(1.0, 2.0, 3.0), RigidBody::Dynamic))
            .id();

        app.update();

        let pos = Rapier3dBackend::get_position(app.world(), entity);
        assert!((pos - Vec3::new(1.0, 2.0, 3.0)).length() < 0.01);
        assert!((Rapier3dBackend::get_up(app.world(), entity) - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn rapier_backend_velocity() {
        let mut app = create_test_app();

        let entity = app
            .world_mut()
            .spawn((
                Transform::default(),
                RigidBody::Dynamic,
                Velocity::linear(Vec3::new(5.0, 3.0, 0.0)),
            ))
            .id();

        Rapier3dBackend::set_velocity(app.world_mut(), entity, Vec3::new(0.0, 0.0, -7.0));

        let velocity = app.world().get::<Velocity>(entity).expect("velocity present");
        assert!((velocity.linvel - Vec3::new(0.0, 0.0, -7.0)).length() < 0.01);
        assert!((velocity.angvel - Vec3::ZERO).length() < 0.01);
    }

    #[test]
    fn rapier_backend_reads_world_gravity() {
        let mut app = create_test_app();
        app.update();

        let gravity = Rapier3dBackend::get_gravity(app.world_mut());
        assert!((gravity.y + 9.81).abs() < 0.01);
    }

    #[test]
    fn apply_shape_builds_offset_capsule() {
        let mut app = create_test_app();
        let entity = app.world_mut().spawn(Transform::default()).id();

        let shape = CapsuleShape {
            radius: 0.5,
            height: 2.0,
            center: Vec3::Y,
        };
        Rapier3dBackend::apply_shape(app.world_mut(), entity, &shape);

        let collider = app.world().get::<Collider>(entity).expect("collider inserted");
        let aabb = collider.raw.compute_local_aabb();
        assert!((aabb.mins.y - 0.0).abs() < 1e-4);
        assert!((aabb.maxs.y - 2.0).abs() < 1e-4);

        let friction = app.world().get::<Friction>(entity).expect("friction inserted");
        assert_eq!(friction.coefficient, 0.0);
    }

    #[test]
    fn apply_shape_keeps_assigned_material() {
        let mut app = create_test_app();
        let entity = app
            .world_mut()
            .spawn((Transform::default(), Friction::coefficient(0.8)))
            .id();

        let shape = CapsuleShape {
            radius: 0.3,
            height: 1.0,
            center: Vec3::ZERO,
        };
        Rapier3dBackend::apply_shape(app.world_mut(), entity, &shape);

        assert_eq!(app.world().get::<Friction>(entity).map(|f| f.coefficient), Some(0.8));
    }

    #[test]
    fn apply_body_disables_backend_gravity() {
        let mut app = create_test_app();
        let entity = app.world_mut().spawn(Transform::default()).id();

        let params = BodyParams {
            mass: 2.0,
            linear_drag: 0.1,
            angular_drag: 0.05,
            use_gravity: false,
            kinematic: false,
            freeze_rotation: true,
        };
        Rapier3dBackend::apply_body(app.world_mut(), entity, &params);

        let world = app.world();
        assert_eq!(world.get::<GravityScale>(entity).map(|g| g.0), Some(0.0));
        assert_eq!(world.get::<RigidBody>(entity), Some(&RigidBody::Dynamic));
        assert_eq!(world.get::<LockedAxes>(entity), Some(&LockedAxes::ROTATION_LOCKED));
        assert_eq!(
            world.get::<Damping>(entity).map(|d| d.linear_damping),
            Some(0.1)
        );
    }

    #[test]
    fn extra_child_rigid_body_is_removed() {
        let mut app = create_test_app();
        app.add_plugins(CharacterControllerPlugin::<Rapier3dBackend>::default());

        let mut child = Entity::PLACEHOLDER;
        app.world_mut()
            .spawn((
                Transform::default(),
                CharacterController::new(),
                Rapier3dCharacterBundle::new(),
            ))
            .with_children(|parent| {
                child = parent
                    .spawn((Transform::default(), RigidBody::Dynamic, Collider::ball(0.1)))
                    .id();
            });

        app.world_mut().run_schedule(FixedUpdate);

        assert!(app.world().get::<RigidBody>(child).is_none());
        // Extra colliders are only reported
        assert!(app.world().get::<Collider>(child).is_some());
    }

    #[test]
    fn rapier_character_bundle_defaults() {
        let mut app = create_test_app();

        let entity = app
            .world_mut()
            .spawn((Transform::default(), Rapier3dCharacterBundle::new()))
            .id();

        let world = app.world();
        assert_eq!(world.get::<RigidBody>(entity), Some(&RigidBody::Dynamic));
        assert_eq!(world.get::<GravityScale>(entity).map(|g| g.0), Some(0.0));
        assert_eq!(world.get::<LockedAxes>(entity), Some(&LockedAxes::ROTATION_LOCKED));
        assert!(world.get::<Velocity>(entity).is_some());
    }
}
