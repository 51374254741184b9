//! The character controller component.
//!
//! [`CharacterController`] owns everything the per-tick pipeline needs: the
//! body description, the ground caster settings, the ignore set, the latest
//! ground state and the move intent. Systems drive it through
//! [`CharacterController::detect_ground`] and
//! [`CharacterController::compose_velocity`]; hosts without an ECS schedule can
//! build one with [`CharacterController::attached_to`] and call
//! [`CharacterController::tick`] directly.

use bevy::prelude::*;

use crate::backend::GroundCaster;
use crate::collision::CollisionData;
use crate::composer::VelocityComposer;
use crate::config::{BodyConfig, ControllerConfig, PendingSync};
use crate::detection::{GroundState, IgnoreSet, ShapeCaster};
use crate::intent::MoveIntent;

/// Capsule character controller.
///
/// The controller is either **Grounded** or **Airborne**, decided every tick
/// by the latest ground cast alone (no hysteresis).
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use capsule_character_controller::prelude::*;
///
/// let mut controller = CharacterController::new()
///     .with_config(ControllerConfig::default().with_slope_limit(45.0));
/// controller.set_move(Vec3::new(3.0, 0.0, 0.0));
/// assert_eq!(controller.move_vector(), Vec3::new(3.0, 0.0, 0.0));
/// assert!(!controller.is_grounded());
/// ```
#[derive(Component, Reflect, Debug, Clone, Default)]
#[reflect(Component)]
pub struct CharacterController {
    /// Slope and gravity tuning.
    pub config: ControllerConfig,
    /// Ground cast settings.
    pub caster: ShapeCaster,

    body: BodyConfig,
    ground: GroundState,
    intent: MoveIntent,

    #[reflect(ignore)]
    ignore: IgnoreSet,
}

impl CharacterController {
    /// Create a controller with default body, caster and tuning.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: replace the body description.
    pub fn with_body(mut self, body: BodyConfig) -> Self {
        self.body = body;
        self
    }

    /// Builder: replace the tuning parameters.
    pub fn with_config(mut self, config: ControllerConfig) -> Self {
        self.config = config;
        self
    }

    /// Builder: replace the ground cast settings.
    pub fn with_caster(mut self, caster: ShapeCaster) -> Self {
        self.caster = caster;
        self
    }

    /// Create a controller already bound to its body entity.
    ///
    /// Use this when driving [`tick`](Self::tick) without the plugin, which
    /// otherwise binds new controllers itself.
    pub fn attached_to(entity: Entity) -> Self {
        let mut controller = Self::default();
        controller.attach(entity);
        controller
    }

    /// Bind the controller to the entity carrying its body and collider.
    ///
    /// The entity becomes the protected member of the ignore set. Until a
    /// controller is bound, its ignore set is empty and nothing keeps the
    /// sweep off its own collider.
    pub fn attach(&mut self, entity: Entity) {
        self.ignore.bind_owner(entity);
    }

    /// Entity the controller is attached to.
    pub fn owner(&self) -> Option<Entity> {
        self.ignore.owner()
    }

    // === Intent ===

    /// Set the desired velocity for the next tick. Last call wins.
    ///
    /// Does not touch the physics backend.
    pub fn set_move(&mut self, vector: Vec3) {
        self.intent.set(vector);
    }

    /// Current move vector, including the controller-managed vertical term.
    pub fn move_vector(&self) -> Vec3 {
        self.intent.vector()
    }

    pub fn intent(&self) -> &MoveIntent {
        &self.intent
    }

    // === Per-tick pipeline ===

    /// Cast for ground and rebuild the ground state.
    pub fn detect_ground<C: GroundCaster + ?Sized>(
        &mut self,
        caster: &C,
        position: Vec3,
        up: Vec3,
    ) -> &GroundState {
        let hit = self.cast_ground(caster, position, up);
        self.apply_ground_hit(hit, up)
    }

    /// Cast for ground without touching the stored state.
    pub fn cast_ground<C: GroundCaster + ?Sized>(
        &self,
        caster: &C,
        position: Vec3,
        up: Vec3,
    ) -> Option<CollisionData> {
        self.caster
            .cast_for_ground(caster, position, up, self.body.height(), &self.ignore)
    }

    /// Rebuild the ground state from a cast made with
    /// [`cast_ground`](Self::cast_ground).
    pub fn apply_ground_hit(&mut self, hit: Option<CollisionData>, up: Vec3) -> &GroundState {
        self.ground = GroundState::derive(hit, up, &self.config);
        &self.ground
    }

    /// Compose this tick's velocity from the stored intent and ground state.
    ///
    /// The result is stored back as the move vector so the vertical term
    /// carries into the next tick.
    pub fn compose_velocity(&mut self, world_gravity_y: f32, dt: f32) -> Vec3 {
        let velocity = VelocityComposer::compose(
            self.intent.vector(),
            &self.ground,
            &self.config,
            world_gravity_y,
            dt,
        );
        self.intent.set(velocity);
        velocity
    }

    /// Run one physics tick: detect ground, then compose the velocity to
    /// apply to the body.
    ///
    /// The controller must be bound first ([`attached_to`](Self::attached_to)
    /// or [`attach`](Self::attach)) so its own collider is ignored.
    pub fn tick<C: GroundCaster + ?Sized>(
        &mut self,
        caster: &C,
        position: Vec3,
        up: Vec3,
        world_gravity_y: f32,
        dt: f32,
    ) -> Vec3 {
        self.detect_ground(caster, position, up);
        self.compose_velocity(world_gravity_y, dt)
    }

    // === Ground state ===

    pub fn ground(&self) -> &GroundState {
        &self.ground
    }

    pub fn is_grounded(&self) -> bool {
        self.ground.is_grounded
    }

    pub fn on_slope(&self) -> bool {
        self.ground.on_slope
    }

    /// Sphere centre at the end of the ground sweep, for debug drawing.
    pub fn probe_end(&self, position: Vec3, up: Vec3) -> Vec3 {
        self.caster.probe_end(position, up, self.body.height())
    }

    // === Body ===

    pub fn body(&self) -> &BodyConfig {
        &self.body
    }

    /// Set the capsule radius. See [`BodyConfig::set_radius`].
    ///
    /// Also makes sure the own collider is in the ignore set.
    pub fn set_radius(&mut self, radius: f32) -> bool {
        let changed = self.body.set_radius(radius);
        if changed {
            self.ignore.ensure_owner();
        }
        changed
    }

    pub fn set_height(&mut self, height: f32) -> bool {
        self.body.set_height(height)
    }

    pub fn set_center(&mut self, center: Vec3) -> bool {
        self.body.set_center(center)
    }

    pub fn set_mass(&mut self, mass: f32) -> bool {
        self.body.set_mass(mass)
    }

    pub fn set_drag(&mut self, drag: f32) -> bool {
        self.body.set_drag(drag)
    }

    pub fn set_angular_drag(&mut self, drag: f32) -> bool {
        self.body.set_angular_drag(drag)
    }

    /// Re-apply the body setter rules after reflection writes.
    /// See [`BodyConfig::revalidate`].
    pub fn revalidate_body(&mut self) -> bool {
        let changed = self.body.revalidate();
        if changed {
            self.ignore.ensure_owner();
        }
        changed
    }

    /// Take pending body changes for the backend. Nothing is returned while
    /// the simulation is inactive.
    pub fn take_pending(&mut self, simulation_active: bool) -> PendingSync {
        self.body.take_pending(simulation_active)
    }

    // === Ignore set ===

    pub fn ignore_set(&self) -> &IgnoreSet {
        &self.ignore
    }

    pub fn ignore_set_mut(&mut self) -> &mut IgnoreSet {
        &mut self.ignore
    }
}
