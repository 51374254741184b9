//! Controller configuration.
//!
//! This module defines the physical body description ([`BodyConfig`]) with its
//! validated setters, and the tuning parameters for slope classification and
//! gravity ([`ControllerConfig`]).

use bevy::prelude::*;

/// Capsule shape parameters pushed to the physics backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapsuleShape {
    /// Radius of the hemispherical caps.
    pub radius: f32,
    /// Total height of the capsule, caps included.
    pub height: f32,
    /// Offset of the capsule centre from the body origin.
    pub center: Vec3,
}

impl CapsuleShape {
    /// Half length of the capsule's inner segment (height without the caps).
    #[inline]
    pub fn half_segment(&self) -> f32 {
        (self.height * 0.5 - self.radius).max(0.0)
    }
}

/// Rigid body parameters pushed to the physics backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyParams {
    pub mass: f32,
    pub linear_drag: f32,
    pub angular_drag: f32,
    /// Backend gravity. Always off: the controller integrates gravity itself.
    pub use_gravity: bool,
    /// Always false: the body stays dynamic so it still collides.
    pub kinematic: bool,
    /// Always true: the backend must not tumble the capsule.
    pub freeze_rotation: bool,
}

/// Changes waiting to be pushed to the physics backend.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PendingSync {
    pub shape: Option<CapsuleShape>,
    pub body: Option<BodyParams>,
}

impl PendingSync {
    /// Returns `true` if there is nothing to push.
    pub fn is_empty(&self) -> bool {
        self.shape.is_none() && self.body.is_none()
    }
}

/// Physical shape and mass/drag description of a character body.
///
/// All fields are private and mutated through validated setters. Invalid
/// values are clamped, never rejected with an error:
/// - `height`, `mass` and both drags are clamped to `>= 0`
/// - `radius` is clamped to `[0, height / 2]` (and forced to 0 when height is 0)
///
/// Each setter is a no-op when the value is already in effect. A real change
/// marks the shape or body as pending, and [`BodyConfig::take_pending`] hands
/// the pending payload to whoever pushes it to the backend.
///
/// Reflection writes skip the setters; [`BodyConfig::revalidate`] brings them
/// back in line.
#[derive(Reflect, Debug, Clone)]
pub struct BodyConfig {
    radius: f32,
    height: f32,
    center: Vec3,
    mass: f32,
    linear_drag: f32,
    angular_drag: f32,

    #[reflect(ignore)]
    pending_shape: bool,
    #[reflect(ignore)]
    pending_body: bool,
    #[reflect(ignore)]
    pushed_shape: Option<CapsuleShape>,
    #[reflect(ignore)]
    pushed_body: Option<BodyParams>,
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            radius: 0.5,
            height: 2.0,
            center: Vec3::Y, // capsule sits on the body origin
            mass: 1.0,
            linear_drag: 0.0,
            angular_drag: 0.05,

            // Initial push at attachment
            pending_shape: true,
            pending_body: true,
            pushed_shape: None,
            pushed_body: None,
        }
    }
}

impl BodyConfig {
    /// Create a body config with default dimensions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set the capsule dimensions (height first, then radius).
    pub fn with_capsule(mut self, radius: f32, height: f32) -> Self {
        self.set_height(height);
        self.set_radius(radius);
        self
    }

    /// Builder: set the capsule centre offset.
    pub fn with_center(mut self, center: Vec3) -> Self {
        self.set_center(center);
        self
    }

    /// Builder: set mass and drags.
    pub fn with_physics(mut self, mass: f32, linear_drag: f32, angular_drag: f32) -> Self {
        self.set_mass(mass);
        self.set_drag(linear_drag);
        self.set_angular_drag(angular_drag);
        self
    }

    #[inline]
    pub fn radius(&self) -> f32 {
        self.radius
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.height
    }

    #[inline]
    pub fn center(&self) -> Vec3 {
        self.center
    }

    #[inline]
    pub fn mass(&self) -> f32 {
        self.mass
    }

    #[inline]
    pub fn linear_drag(&self) -> f32 {
        self.linear_drag
    }

    #[inline]
    pub fn angular_drag(&self) -> f32 {
        self.angular_drag
    }

    /// Set the capsule radius, clamped into `[0, height / 2]`.
    ///
    /// Returns `true` if the stored value changed.
    pub fn set_radius(&mut self, radius: f32) -> bool {
        if radius.is_nan() {
            return false;
        }
        let radius = clamp_radius(radius, self.height);
        if radius == self.radius {
            return false;
        }
        self.radius = radius;
        self.pending_shape = true;
        true
    }

    /// Set the capsule height, clamped to `>= 0`.
    ///
    /// The stored radius is re-validated against the new height, so the
    /// radius invariant holds whichever setter runs last.
    pub fn set_height(&mut self, height: f32) -> bool {
        if height.is_nan() {
            return false;
        }
        let height = height.max(0.0);
        if height == self.height {
            return false;
        }
        self.height = height;
        self.radius = clamp_radius(self.radius, height);
        self.pending_shape = true;
        true
    }

    /// Set the capsule centre offset. Compared by value.
    pub fn set_center(&mut self, center: Vec3) -> bool {
        if center.is_nan() || center == self.center {
            return false;
        }
        self.center = center;
        self.pending_shape = true;
        true
    }

    pub fn set_mass(&mut self, mass: f32) -> bool {
        set_non_negative(&mut self.mass, mass, &mut self.pending_body)
    }

    pub fn set_drag(&mut self, drag: f32) -> bool {
        set_non_negative(&mut self.linear_drag, drag, &mut self.pending_body)
    }

    pub fn set_angular_drag(&mut self, drag: f32) -> bool {
        set_non_negative(&mut self.angular_drag, drag, &mut self.pending_body)
    }

    /// Current capsule shape.
    pub fn capsule_shape(&self) -> CapsuleShape {
        CapsuleShape {
            radius: self.radius,
            height: self.height,
            center: self.center,
        }
    }

    /// Current rigid body parameters.
    pub fn body_params(&self) -> BodyParams {
        BodyParams {
            mass: self.mass,
            linear_drag: self.linear_drag,
            angular_drag: self.angular_drag,
            use_gravity: false,
            kinematic: false,
            freeze_rotation: true,
        }
    }

    /// Returns `true` if a shape or body push is waiting.
    pub fn has_pending(&self) -> bool {
        self.pending_shape || self.pending_body
    }

    /// Take the pending payloads for the backend.
    ///
    /// While the simulation is not active nothing is returned and the flags
    /// are kept, so edits made in that state are pushed once it resumes.
    pub fn take_pending(&mut self, simulation_active: bool) -> PendingSync {
        if !simulation_active {
            return PendingSync::default();
        }

        let shape = std::mem::take(&mut self.pending_shape).then(|| self.capsule_shape());
        let body = std::mem::take(&mut self.pending_body).then(|| self.body_params());
        if shape.is_some() {
            self.pushed_shape = shape;
        }
        if body.is_some() {
            self.pushed_body = body;
        }
        PendingSync { shape, body }
    }

    /// Re-apply the setter rules to the stored values.
    ///
    /// Writes through reflection (inspectors, scenes) land on the fields
    /// directly. This clamps them back into range, restores NaN fields from
    /// the last pushed values, and raises the pending flags for anything that
    /// differs from what the backend last received.
    ///
    /// Returns `true` if a value was corrected or a push was raised.
    pub fn revalidate(&mut self) -> bool {
        let defaults = Self::default();
        let shape_fallback = self.pushed_shape.unwrap_or_else(|| defaults.capsule_shape());
        let body_fallback = self.pushed_body.unwrap_or_else(|| defaults.body_params());
        let before = (self.capsule_shape(), self.body_params());

        self.height = non_negative_or(self.height, shape_fallback.height);
        let radius = if self.radius.is_nan() {
            shape_fallback.radius
        } else {
            self.radius
        };
        self.radius = clamp_radius(radius, self.height);
        if self.center.is_nan() {
            self.center = shape_fallback.center;
        }
        self.mass = non_negative_or(self.mass, body_fallback.mass);
        self.linear_drag = non_negative_or(self.linear_drag, body_fallback.linear_drag);
        self.angular_drag = non_negative_or(self.angular_drag, body_fallback.angular_drag);

        // NaN never compares equal, so a NaN field counts as corrected
        let corrected = before != (self.capsule_shape(), self.body_params());

        let mut raised = false;
        if !self.pending_shape && self.pushed_shape != Some(self.capsule_shape()) {
            self.pending_shape = true;
            raised = true;
        }
        if !self.pending_body && self.pushed_body != Some(self.body_params()) {
            self.pending_body = true;
            raised = true;
        }
        corrected || raised
    }
}

fn non_negative_or(value: f32, fallback: f32) -> f32 {
    if value.is_nan() {
        fallback
    } else {
        value.max(0.0)
    }
}

fn clamp_radius(radius: f32, height: f32) -> f32 {
    if height <= 0.0 {
        0.0
    } else {
        radius.clamp(0.0, height * 0.5)
    }
}

fn set_non_negative(field: &mut f32, value: f32, pending: &mut bool) -> bool {
    if value.is_nan() {
        return false;
    }
    let value = value.max(0.0);
    if value == *field {
        return false;
    }
    *field = value;
    *pending = true;
    true
}

/// How the slope angle is compared against the slope limit.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SlopeRule {
    /// On a slope when the ground is at least as steep as the limit.
    #[default]
    SteeperThanLimit,
    /// On a slope when the ground is shallower than the limit.
    ///
    /// Kept for content tuned against controllers that used this comparison.
    ShallowerThanLimit,
}

impl SlopeRule {
    /// Classify a slope angle (degrees) against a limit (degrees).
    pub fn is_slope(self, angle_deg: f32, limit_deg: f32) -> bool {
        match self {
            Self::SteeperThanLimit => angle_deg >= limit_deg,
            Self::ShallowerThanLimit => angle_deg < limit_deg,
        }
    }
}

/// Tuning parameters for slope classification and self-managed gravity.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct ControllerConfig {
    // === Slope Settings ===
    /// Slope limit in degrees, clamped to `0..=90`.
    pub slope_limit_deg: f32,

    /// Comparison used to decide `on_slope`.
    pub slope_rule: SlopeRule,

    // === Gravity Settings ===
    /// When false the move vector passes through untouched and the caller
    /// owns vertical motion.
    pub auto_apply_gravity: bool,

    /// Multiplier on world gravity while airborne.
    pub gravity_force: f32,

    /// Constant downward velocity bias while grounded.
    pub stick_to_ground_force: f32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            // Slope settings
            slope_limit_deg: 30.0,
            slope_rule: SlopeRule::SteeperThanLimit,

            // Gravity settings
            auto_apply_gravity: true,
            gravity_force: 30.0,
            stick_to_ground_force: 10.0,
        }
    }
}

impl ControllerConfig {
    /// Config where the caller owns vertical motion entirely.
    pub fn manual_gravity() -> Self {
        Self {
            auto_apply_gravity: false,
            ..default()
        }
    }

    /// Builder: set the slope limit (degrees, clamped to `0..=90`).
    pub fn with_slope_limit(mut self, degrees: f32) -> Self {
        self.slope_limit_deg = degrees.clamp(0.0, 90.0);
        self
    }

    /// Builder: set the slope comparison rule.
    pub fn with_slope_rule(mut self, rule: SlopeRule) -> Self {
        self.slope_rule = rule;
        self
    }

    /// Builder: enable or disable self-managed gravity.
    pub fn with_auto_gravity(mut self, enabled: bool) -> Self {
        self.auto_apply_gravity = enabled;
        self
    }

    /// Builder: set the airborne gravity multiplier.
    pub fn with_gravity_force(mut self, force: f32) -> Self {
        self.gravity_force = force;
        self
    }

    /// Builder: set the grounded stick-to-ground bias.
    pub fn with_stick_to_ground_force(mut self, force: f32) -> Self {
        self.stick_to_ground_force = force;
        self
    }
}
