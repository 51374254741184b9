//! Physics backend abstraction.
//!
//! This module defines the trait that physics backends must implement
//! to work with the character controller, and the [`GroundCaster`] seam the
//! ground detection runs against. This allows easy swapping between physics
//! engines (Rapier3D, Avian, custom, etc.).

use bevy::prelude::*;

use crate::collision::CollisionData;
use crate::config::{BodyParams, CapsuleShape};

/// Trait for physics backend implementations.
///
/// Implement this trait to integrate a physics engine with the character
/// controller. The backend owns the physical body and collider: the
/// controller only pushes shape/body parameters and assigns linear velocity.
///
/// Ground detection needs a live query context, which most engines expose as
/// a system parameter, so it is performed by a system the backend plugin adds
/// to [`CharacterControllerSet::Sensors`](crate::CharacterControllerSet::Sensors)
/// through a [`GroundCaster`]. That system reads body frames with
/// [`controller_frames`](crate::systems::controller_frames), which goes
/// through [`get_position`](Self::get_position) and [`get_up`](Self::get_up).
///
/// # Example
///
/// For an example implementation, see the `rapier` module's `Rapier3dBackend`
/// which implements this trait for Bevy Rapier3D.
pub trait CharacterPhysicsBackend: 'static + Send + Sync {
    /// Returns the plugin that sets up this backend.
    fn plugin() -> impl Plugin;

    /// Set the linear velocity of an entity.
    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec3);

    /// Get the current position of an entity.
    fn get_position(world: &World, entity: Entity) -> Vec3;

    /// Get the body's local up axis.
    fn get_up(_world: &World, _entity: Entity) -> Vec3 {
        Vec3::Y
    }

    /// Get the world gravity vector.
    ///
    /// Takes `&mut World` because engines commonly keep gravity on a
    /// configuration component that has to be queried.
    fn get_gravity(world: &mut World) -> Vec3;

    /// Get the fixed timestep delta time.
    fn get_fixed_timestep(world: &World) -> f32 {
        world
            .get_resource::<Time<Fixed>>()
            .map(|t| t.delta_secs())
            .filter(|&d| d > 0.0)
            .unwrap_or(1.0 / 60.0)
    }

    /// Push capsule dimensions to the entity's collider.
    ///
    /// Backends should also assign a zero-friction material if the collider
    /// does not have one yet.
    fn apply_shape(world: &mut World, entity: Entity, shape: &CapsuleShape);

    /// Push mass, drag and the gravity/kinematic/rotation overrides to the
    /// entity's rigid body.
    fn apply_body(world: &mut World, entity: Entity, params: &BodyParams);
}

/// Empty plugin for backends that don't need additional setup.
pub struct NoOpBackendPlugin;

impl Plugin for NoOpBackendPlugin {
    fn build(&self, _app: &mut App) {}
}

/// Smallest `normal · -direction` for a surface to count as lying across the
/// sweep. Walls and overhangs fall below it.
pub const MIN_FACING_DOT: f32 = 1e-3;

/// A sphere sweep issued by ground detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundCastRequest {
    /// Centre of the sphere at the start of the sweep.
    pub origin: Vec3,
    /// Sweep direction (normalized).
    pub direction: Vec3,
    /// Sphere radius.
    pub radius: f32,
    /// Maximum sweep distance.
    pub max_distance: f32,
    /// Collision layers the sweep may hit.
    pub layer_mask: u32,
    /// Body whose colliders are excluded from the query.
    pub exclude: Option<Entity>,
}

impl GroundCastRequest {
    /// Create a new sweep request hitting all layers.
    pub fn new(origin: Vec3, direction: Vec3, radius: f32, max_distance: f32) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
            radius,
            max_distance,
            layer_mask: u32::MAX,
            exclude: None,
        }
    }

    /// Restrict the sweep to the given collision layers.
    pub fn with_layer_mask(mut self, mask: u32) -> Self {
        self.layer_mask = mask;
        self
    }

    /// Exclude an entity's body from the sweep.
    pub fn excluding(mut self, entity: Entity) -> Self {
        self.exclude = Some(entity);
        self
    }

    /// Centre of the sphere after travelling `distance` along the sweep.
    pub fn center_at(&self, distance: f32) -> Vec3 {
        self.origin + self.direction * distance
    }

    /// Whether a surface with this normal faces the sweep.
    ///
    /// A sphere that starts in contact with a wall reports the wall's
    /// sideways normal; such hits do not face the sweep.
    pub fn faces(&self, normal: Vec3) -> bool {
        normal.dot(-self.direction) > MIN_FACING_DOT
    }
}

/// Something that can answer ground sweeps.
///
/// Implementations must skip trigger/sensor geometry, honour
/// [`GroundCastRequest::layer_mask`] and [`GroundCastRequest::exclude`],
/// and return the first solid hit within `max_distance`. Colliders the
/// sphere already overlaps at the start of the sweep should be skipped when
/// they do not [face](GroundCastRequest::faces) it.
pub trait GroundCaster {
    fn cast_sphere(&self, request: &GroundCastRequest) -> Option<CollisionData>;
}

impl<F> GroundCaster for F
where
    F: Fn(&GroundCastRequest) -> Option<CollisionData>,
{
    fn cast_sphere(&self, request: &GroundCastRequest) -> Option<CollisionData> {
        self(request)
    }
}
