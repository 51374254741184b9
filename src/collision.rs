//! Shape-cast result structures.
//!
//! These structures hold the results of physics queries (sphere casts) used
//! for ground detection.

use bevy::prelude::*;

/// Information about a shapecast collision.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CollisionData {
    /// Time of impact along the (unit) cast direction.
    pub distance: f32,
    /// Normal of the struck surface, pointing away from it.
    pub normal: Vec3,
    /// World position of the contact point.
    pub point: Vec3,
    /// Collider entity that was hit (if known).
    pub entity: Option<Entity>,
}

impl CollisionData {
    /// Create a collision result.
    pub fn new(distance: f32, normal: Vec3, point: Vec3, entity: Option<Entity>) -> Self {
        Self {
            distance,
            normal,
            point,
            entity,
        }
    }

    /// Whether this hit struck the given collider.
    pub fn is_entity(&self, entity: Entity) -> bool {
        self.entity == Some(entity)
    }
}
