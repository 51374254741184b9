//! # `capsule_character_controller`
//!
//! A 3D capsule rigidbody character controller with physics backend abstraction.
//!
//! This crate provides a character controller that:
//! - Detects ground with a downward sphere cast from the bottom of the capsule
//! - Classifies slopes against a configurable limit
//! - Manages its own gravity (stick-to-ground bias when grounded, integrated
//!   gravity when airborne)
//! - Takes horizontal movement verbatim from a caller-supplied move vector
//! - Keeps the physical capsule in sync with validated body settings
//! - Abstracts physics backend for easy swapping (Rapier3D included)
//!
//! ## Architecture
//!
//! Every fixed physics tick runs the same pipeline, one system set per phase:
//! 1. **Preparation**: body settings are re-validated and pending body/shape
//!    changes are pushed to the backend
//! 2. **Sensors**: the backend sweeps a sphere downward and the ground state is rebuilt
//! 3. **Movement**: the move vector is blended with the vertical term and
//!    applied as the body's linear velocity
//! 4. **StateSync**: [`Grounded`](state::Grounded)/[`Airborne`](state::Airborne)/
//!    [`OnSlope`](state::OnSlope) markers follow the ground state
//!
//! ## Usage
//!
//! ```rust
//! use bevy::prelude::*;
//! use capsule_character_controller::prelude::*;
//!
//! // Create a controller with a custom capsule and slope limit
//! let mut controller = CharacterController::new()
//!     .with_body(BodyConfig::new().with_capsule(0.4, 1.8))
//!     .with_config(ControllerConfig::default().with_slope_limit(40.0));
//!
//! // Input or AI sets the desired velocity before each physics tick
//! controller.set_move(Vec3::new(0.0, 0.0, -7.0));
//! ```

use bevy::prelude::*;

pub mod backend;
pub mod collision;
pub mod composer;
pub mod config;
pub mod controller;
pub mod detection;
pub mod intent;
pub mod state;
pub mod systems;

#[cfg(feature = "rapier3d")]
pub mod rapier;

#[cfg(test)]
pub(crate) mod testing;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::backend::{CharacterPhysicsBackend, GroundCastRequest, GroundCaster};
    pub use crate::collision::CollisionData;
    pub use crate::composer::VelocityComposer;
    pub use crate::config::{BodyConfig, ControllerConfig, SlopeRule};
    pub use crate::controller::CharacterController;
    pub use crate::detection::{GroundState, IgnoreSet, ShapeCaster};
    pub use crate::intent::MoveIntent;
    pub use crate::state::{Airborne, Grounded, OnSlope};
    pub use crate::{CharacterControllerPlugin, CharacterControllerSet, SimulationActive};

    #[cfg(feature = "rapier3d")]
    pub use crate::rapier::{Rapier3dBackend, Rapier3dCharacterBundle};
}

/// System sets for the per-tick pipeline, run in order in `FixedUpdate`.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CharacterControllerSet {
    /// Attach new controllers and push pending body changes.
    Preparation,
    /// Ground detection (added by the backend plugin).
    Sensors,
    /// Velocity composition and application.
    Movement,
    /// Marker component updates.
    StateSync,
}

/// Whether the physics simulation is live.
///
/// Owned by the host. While false, body setters only change configuration
/// and nothing is pushed to the physics backend.
#[derive(Resource, Reflect, Debug, Clone, Copy, PartialEq, Eq)]
#[reflect(Resource)]
pub struct SimulationActive(pub bool);

impl Default for SimulationActive {
    fn default() -> Self {
        Self(true)
    }
}

/// Main plugin for the character controller system.
///
/// This plugin is generic over a physics backend `B` which provides the actual
/// physics operations (ground casts, velocity, shape and body updates).
///
/// # Type Parameters
/// - `B`: The physics backend implementation (e.g., `Rapier3dBackend`)
///
/// # Examples
///
/// With Rapier3D backend:
/// ```rust,no_run
/// use bevy::prelude::*;
/// use bevy_rapier3d::prelude::*;
/// use capsule_character_controller::prelude::*;
///
/// App::new()
///     .add_plugins(DefaultPlugins)
///     .add_plugins(RapierPhysicsPlugin::<NoUserData>::default())
///     .add_plugins(CharacterControllerPlugin::<Rapier3dBackend>::default())
///     .run();
/// ```
pub struct CharacterControllerPlugin<B: backend::CharacterPhysicsBackend> {
    _marker: std::marker::PhantomData<B>,
}

impl<B: backend::CharacterPhysicsBackend> Default for CharacterControllerPlugin<B> {
    fn default() -> Self {
        Self {
            _marker: std::marker::PhantomData,
        }
    }
}

impl<B: backend::CharacterPhysicsBackend> Plugin for CharacterControllerPlugin<B> {
    fn build(&self, app: &mut App) {
        // Register core types
        app.register_type::<controller::CharacterController>();
        app.register_type::<config::BodyConfig>();
        app.register_type::<config::ControllerConfig>();
        app.register_type::<config::SlopeRule>();
        app.register_type::<detection::ShapeCaster>();
        app.register_type::<detection::GroundState>();
        app.register_type::<intent::MoveIntent>();
        app.register_type::<state::Grounded>();
        app.register_type::<state::Airborne>();
        app.register_type::<state::OnSlope>();
        app.register_type::<SimulationActive>();

        app.init_resource::<SimulationActive>();

        app.configure_sets(
            FixedUpdate,
            (
                CharacterControllerSet::Preparation,
                CharacterControllerSet::Sensors,
                CharacterControllerSet::Movement,
                CharacterControllerSet::StateSync,
            )
                .chain(),
        );

        // Add the physics backend plugin
        app.add_plugins(B::plugin());

        app.add_systems(
            FixedUpdate,
            (
                systems::attach_controllers,
                systems::revalidate_body_config,
                systems::sync_body_config::<B>,
            )
                .chain()
                .in_set(CharacterControllerSet::Preparation),
        );
        app.add_systems(
            FixedUpdate,
            systems::apply_controller_velocity::<B>.in_set(CharacterControllerSet::Movement),
        );
        app.add_systems(
            FixedUpdate,
            systems::sync_state_markers.in_set(CharacterControllerSet::StateSync),
        );
    }
}
