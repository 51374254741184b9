//! Ground detection.
//!
//! [`ShapeCaster`] sweeps a sphere down from the bottom of the body,
//! [`IgnoreSet`] filters out the controller's own colliders, and
//! [`GroundState`] is rebuilt from the result once per physics tick.

use bevy::platform::collections::HashSet;
use bevy::prelude::*;

use crate::backend::{GroundCaster, GroundCastRequest};
use crate::collision::CollisionData;
use crate::config::ControllerConfig;

/// Collider entities excluded from ground detection.
///
/// Once bound, the owning controller's own collider is always a member and
/// cannot be removed.
#[derive(Debug, Clone, Default)]
pub struct IgnoreSet {
    owner: Option<Entity>,
    entries: HashSet<Entity>,
}

impl IgnoreSet {
    /// Create a set already bound to its owner.
    pub fn new(owner: Entity) -> Self {
        let mut set = Self::default();
        set.bind_owner(owner);
        set
    }

    /// Bind the set to the collider entity that owns it.
    ///
    /// A previously bound owner becomes an ordinary, removable member.
    pub fn bind_owner(&mut self, owner: Entity) {
        self.owner = Some(owner);
        self.entries.insert(owner);
    }

    /// The owning collider entity, if bound.
    pub fn owner(&self) -> Option<Entity> {
        self.owner
    }

    /// Re-insert the owner. No-op when unbound.
    pub fn ensure_owner(&mut self) {
        if let Some(owner) = self.owner {
            self.entries.insert(owner);
        }
    }

    /// Add a collider. Returns `true` if it was not already present.
    pub fn insert(&mut self, entity: Entity) -> bool {
        self.entries.insert(entity)
    }

    /// Remove a collider. The owner is never removed.
    pub fn remove(&mut self, entity: Entity) -> bool {
        if self.owner == Some(entity) {
            return false;
        }
        self.entries.remove(&entity)
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.entries.contains(&entity)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entries.iter().copied()
    }
}

/// Downward sphere cast used for ground detection.
///
/// The probe starts at the bottom of the body (the midpoint offset down by
/// half the height) with the sphere resting on that point, and sweeps along
/// `-up` by [`ShapeCaster::cast_distance`].
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct ShapeCaster {
    /// Radius of the swept sphere.
    pub cast_radius: f32,
    /// How far below the body the cast reaches, as a fraction in `[0, 1]`.
    pub cast_depth: f32,
    /// Collision layers considered ground.
    pub layer_mask: u32,
}

impl Default for ShapeCaster {
    fn default() -> Self {
        Self {
            cast_radius: 0.5,
            cast_depth: 0.03,
            layer_mask: u32::MAX,
        }
    }
}

impl ShapeCaster {
    /// Builder: set the sweep sphere radius.
    pub fn with_cast_radius(mut self, radius: f32) -> Self {
        self.cast_radius = radius.max(0.0);
        self
    }

    /// Builder: set the cast depth fraction (clamped to `[0, 1]`).
    pub fn with_cast_depth(mut self, depth: f32) -> Self {
        self.cast_depth = depth.clamp(0.0, 1.0);
        self
    }

    /// Builder: set the ground layer mask.
    pub fn with_layer_mask(mut self, mask: u32) -> Self {
        self.layer_mask = mask;
        self
    }

    /// Sweep length for a body of the given height.
    ///
    /// `height / 2 + cast_radius - (1 - cast_depth)`, never negative.
    pub fn cast_distance(&self, height: f32) -> f32 {
        let depth = self.cast_depth.clamp(0.0, 1.0);
        (height * 0.5 + self.cast_radius - (1.0 - depth)).max(0.0)
    }

    /// Vertical midpoint of a body standing on `position`.
    #[inline]
    pub fn body_midpoint(position: Vec3, up: Vec3, height: f32) -> Vec3 {
        position + up * height * 0.5
    }

    /// Probe origin: the midpoint offset down by half the height.
    pub fn probe_origin(&self, position: Vec3, up: Vec3, height: f32) -> Vec3 {
        Self::body_midpoint(position, up, height) - up * height * 0.5
    }

    /// Sphere centre at the start of the sweep.
    pub fn probe_start(&self, position: Vec3, up: Vec3, height: f32) -> Vec3 {
        self.probe_origin(position, up, height) + up * self.cast_radius
    }

    /// Sphere centre at the end of the sweep. Useful for debug drawing.
    pub fn probe_end(&self, position: Vec3, up: Vec3, height: f32) -> Vec3 {
        self.probe_start(position, up, height) - up * self.cast_distance(height)
    }

    /// Build the sweep request for a body.
    pub fn request(&self, position: Vec3, up: Vec3, height: f32) -> GroundCastRequest {
        GroundCastRequest::new(
            self.probe_start(position, up, height),
            -up,
            self.cast_radius,
            self.cast_distance(height),
        )
        .with_layer_mask(self.layer_mask)
    }

    /// Cast for ground under a body.
    ///
    /// Returns `None` if nothing is hit, the sweep length is zero, the first
    /// struck collider is in `ignore`, or the hit surface does not face the
    /// sweep (a wall touching the capsule, an overhang).
    pub fn cast_for_ground<C: GroundCaster + ?Sized>(
        &self,
        caster: &C,
        position: Vec3,
        up: Vec3,
        height: f32,
        ignore: &IgnoreSet,
    ) -> Option<CollisionData> {
        let mut request = self.request(position, up, height);
        if request.max_distance <= 0.0 {
            return None;
        }
        if let Some(owner) = ignore.owner() {
            request = request.excluding(owner);
        }

        let hit = caster.cast_sphere(&request)?;
        if hit.entity.is_some_and(|e| ignore.contains(e)) || !request.faces(hit.normal) {
            return None;
        }
        Some(hit)
    }
}

/// Ground state derived from the latest cast.
///
/// Rebuilt wholesale every tick; nothing carries over from the previous one.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq)]
pub struct GroundState {
    pub is_grounded: bool,
    /// Only ever true while grounded.
    pub on_slope: bool,
    /// `None` while airborne.
    pub ground_normal: Option<Vec3>,
    /// Angle between the ground normal and up, in degrees. 0 while airborne.
    pub slope_angle_deg: f32,
    #[reflect(ignore)]
    pub hit: Option<CollisionData>,
}

impl GroundState {
    /// Airborne state.
    pub fn airborne() -> Self {
        Self::default()
    }

    /// Derive the ground state from a (filtered) cast result.
    pub fn derive(hit: Option<CollisionData>, up: Vec3, config: &ControllerConfig) -> Self {
        let Some(hit) = hit else {
            return Self::airborne();
        };

        let slope_angle_deg = hit.normal.angle_between(up).to_degrees();
        let limit = config.slope_limit_deg.clamp(0.0, 90.0);

        Self {
            is_grounded: true,
            on_slope: config.slope_rule.is_slope(slope_angle_deg, limit),
            ground_normal: Some(hit.normal),
            slope_angle_deg,
            hit: Some(hit),
        }
    }

    /// Collider the body is standing on.
    pub fn ground_entity(&self) -> Option<Entity> {
        self.hit.and_then(|h| h.entity)
    }

    /// Distance from the probe to the ground (`None` while airborne).
    pub fn ground_distance(&self) -> Option<f32> {
        self.hit.map(|h| h.distance)
    }
}
