//! Movement intent.
//!
//! The intent is the desired velocity handed to the controller by player input
//! or AI. The controller reads it every physics tick.

use bevy::prelude::*;

/// Desired velocity for the next physics tick.
///
/// Last writer wins: [`MoveIntent::set`] replaces the whole vector and there is
/// no queueing or decay. The controller owns the vertical component while
/// gravity is self-managed and overwrites it every tick, so fall speed builds
/// up across ticks on top of whatever the caller last set.
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use capsule_character_controller::prelude::*;
///
/// let mut intent = MoveIntent::default();
/// intent.set(Vec3::new(1.0, 0.0, 0.0));
/// intent.set(Vec3::new(0.0, 0.0, 2.0));
/// assert_eq!(intent.vector(), Vec3::new(0.0, 0.0, 2.0));
/// ```
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq)]
pub struct MoveIntent {
    vector: Vec3,
}

impl MoveIntent {
    pub fn new(vector: Vec3) -> Self {
        Self { vector }
    }

    /// Replace the intent.
    pub fn set(&mut self, vector: Vec3) {
        self.vector = vector;
    }

    /// Current intent, vertical term included.
    #[inline]
    pub fn vector(&self) -> Vec3 {
        self.vector
    }

    /// Horizontal (x/z) part of the intent.
    pub fn horizontal(&self) -> Vec3 {
        Vec3::new(self.vector.x, 0.0, self.vector.z)
    }

    /// Vertical part of the intent.
    #[inline]
    pub fn vertical(&self) -> f32 {
        self.vector.y
    }

    /// Zero the intent.
    pub fn clear(&mut self) {
        self.vector = Vec3::ZERO;
    }
}
