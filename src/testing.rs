//! Analytic ground used by unit tests.

use bevy::prelude::*;

use crate::backend::{GroundCaster, GroundCastRequest};
use crate::collision::CollisionData;

/// Infinite plane through `(0, height, 0)` with the given normal.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PlaneGround {
    pub height: f32,
    pub normal: Vec3,
    pub entity: Option<Entity>,
}

impl PlaneGround {
    pub fn flat(height: f32) -> Self {
        Self {
            height,
            normal: Vec3::Y,
            entity: Some(Entity::from_raw(1000)),
        }
    }

    /// Plane tilted about the Z axis by `degrees`.
    pub fn tilted(height: f32, degrees: f32) -> Self {
        let normal = Quat::from_rotation_z(degrees.to_radians()) * Vec3::Y;
        Self {
            normal,
            ..Self::flat(height)
        }
    }

    pub fn with_entity(mut self, entity: Entity) -> Self {
        self.entity = Some(entity);
        self
    }
}

impl GroundCaster for PlaneGround {
    fn cast_sphere(&self, request: &GroundCastRequest) -> Option<CollisionData> {
        let approach = -self.normal.dot(request.direction);
        if approach <= 0.0 {
            return None;
        }

        let plane_offset = self.normal.y * self.height;
        let gap = self.normal.dot(request.origin) - plane_offset - request.radius;
        let distance = (gap / approach).max(0.0);
        if distance > request.max_distance {
            return None;
        }

        let point = request.center_at(distance) - self.normal * request.radius;
        Some(CollisionData::new(distance, self.normal, point, self.entity))
    }
}

/// Surface the sweep sphere already overlaps when it starts.
///
/// Every sweep reports a hit at distance 0 with the given normal.
pub(crate) struct StartContact {
    pub normal: Vec3,
    pub entity: Option<Entity>,
}

impl StartContact {
    pub fn new(normal: Vec3) -> Self {
        Self {
            normal,
            entity: Some(Entity::from_raw(2000)),
        }
    }
}

impl GroundCaster for StartContact {
    fn cast_sphere(&self, request: &GroundCastRequest) -> Option<CollisionData> {
        let point = request.origin - self.normal * request.radius;
        Some(CollisionData::new(0.0, self.normal, point, self.entity))
    }
}

/// Caster that never hits anything.
pub(crate) struct NoGround;

impl GroundCaster for NoGround {
    fn cast_sphere(&self, _request: &GroundCastRequest) -> Option<CollisionData> {
        None
    }
}
