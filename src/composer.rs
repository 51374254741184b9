//! Velocity composition.
//!
//! Blends the caller's move vector with the controller's vertical term:
//! a constant stick-to-ground bias while grounded, and gravity integrated
//! onto the previous vertical velocity while airborne.

use bevy::prelude::*;

use crate::config::ControllerConfig;
use crate::detection::GroundState;

/// Computes the velocity applied to the body each tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct VelocityComposer;

impl VelocityComposer {
    /// Compose the velocity for one tick.
    ///
    /// The horizontal components of `move_vector` pass through. The vertical
    /// component is the previous tick's vertical term plus:
    /// - `-stick_to_ground_force` while grounded
    /// - `gravity_force * dt * world_gravity_y` while airborne
    ///
    /// The caller must store the result back as its move vector so gravity
    /// keeps integrating while airborne. With `auto_apply_gravity` off the
    /// vector is returned unmodified.
    pub fn compose(
        move_vector: Vec3,
        ground: &GroundState,
        config: &ControllerConfig,
        world_gravity_y: f32,
        dt: f32,
    ) -> Vec3 {
        if !config.auto_apply_gravity {
            return move_vector;
        }

        let mut velocity = move_vector;
        if ground.is_grounded {
            velocity.y += -config.stick_to_ground_force;
        } else {
            velocity.y += config.gravity_force * dt * world_gravity_y;
        }

        if ground.on_slope {
            velocity = Self::apply_slope_correction(velocity, ground);
        }

        velocity
    }

    /// Extension point for slope handling.
    ///
    /// Not implemented: slopes get no corrective motion and the velocity is
    /// returned as is.
    pub fn apply_slope_correction(velocity: Vec3, _ground: &GroundState) -> Vec3 {
        velocity
    }
}
