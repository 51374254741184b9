//! State marker components.
//!
//! These components mirror the current ground state of a character controller
//! so other systems can filter on it. They are added/removed automatically in
//! [`CharacterControllerSet::StateSync`](crate::CharacterControllerSet::StateSync).

use bevy::prelude::*;

/// Marker component indicating the character is grounded.
///
/// Added when the ground cast finds ground within reach. Removed when the
/// character becomes airborne.
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use capsule_character_controller::prelude::*;
///
/// // Grounded is a marker component - just use it in queries
/// fn check_grounded(grounded: Option<&Grounded>) -> bool {
///     grounded.is_some()
/// }
/// ```
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Grounded;

/// Marker component indicating the character is airborne.
///
/// Mutually exclusive with [`Grounded`].
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Airborne;

/// Marker component indicating the character stands on a slope.
///
/// Only present together with [`Grounded`].
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct OnSlope {
    /// Ground normal at the contact.
    pub normal: Vec3,
    /// Slope angle in degrees.
    pub angle_deg: f32,
}

impl Default for OnSlope {
    fn default() -> Self {
        Self {
            normal: Vec3::Y,
            angle_deg: 0.0,
        }
    }
}

impl OnSlope {
    pub fn new(normal: Vec3, angle_deg: f32) -> Self {
        Self { normal, angle_deg }
    }

    /// Direction down the slope, or zero on flat ground.
    pub fn downhill(&self, up: Vec3) -> Vec3 {
        (-up).reject_from(self.normal).normalize_or_zero()
    }
}
