//! Core controller systems.
//!
//! These systems drive the per-tick pipeline. They are generic over the
//! physics backend to allow different physics engines to be used. Ground
//! detection itself is added by the backend plugin.

use bevy::prelude::*;

use crate::backend::CharacterPhysicsBackend;
use crate::config::PendingSync;
use crate::controller::CharacterController;
use crate::state::{Airborne, Grounded, OnSlope};
use crate::SimulationActive;

/// Bind newly added controllers to their entity.
pub fn attach_controllers(
    mut q_controllers: Query<(Entity, &mut CharacterController), Added<CharacterController>>,
) {
    for (entity, mut controller) in &mut q_controllers {
        controller.attach(entity);
        debug!("character controller attached to {entity}");
    }
}

/// Re-apply the body setter rules to controllers changed since last tick.
///
/// Catches reflection writes that bypassed the setters, so they are clamped
/// and pushed like any setter call.
pub fn revalidate_body_config(
    mut q_controllers: Query<(Entity, &mut CharacterController), Changed<CharacterController>>,
) {
    for (entity, mut controller) in &mut q_controllers {
        if controller.bypass_change_detection().revalidate_body() {
            debug!("{entity}: body config corrected after a direct write");
        }
    }
}

/// Position and up axis of every controller body, read through the backend.
///
/// Backend ground detection systems cast from these frames.
pub fn controller_frames<B: CharacterPhysicsBackend>(
    world: &mut World,
) -> Vec<(Entity, Vec3, Vec3)> {
    let entities: Vec<Entity> = world
        .query_filtered::<Entity, With<CharacterController>>()
        .iter(world)
        .collect();

    entities
        .into_iter()
        .map(|entity| (entity, B::get_position(world, entity), B::get_up(world, entity)))
        .collect()
}

/// Push pending body configuration changes to the physics backend.
///
/// Nothing is pushed while [`SimulationActive`] is false; changes stay
/// pending until it is set again.
pub fn sync_body_config<B: CharacterPhysicsBackend>(world: &mut World) {
    let simulation_active = world
        .get_resource::<SimulationActive>()
        .map(|active| active.0)
        .unwrap_or(true);
    if !simulation_active {
        return;
    }

    let pending: Vec<(Entity, PendingSync)> = world
        .query::<(Entity, &mut CharacterController)>()
        .iter_mut(world)
        .filter(|(_, controller)| controller.body().has_pending())
        .map(|(entity, mut controller)| (entity, controller.take_pending(simulation_active)))
        .collect();

    for (entity, sync) in pending {
        if let Some(shape) = sync.shape {
            B::apply_shape(world, entity, &shape);
        }
        if let Some(params) = sync.body {
            B::apply_body(world, entity, &params);
        }
    }
}

/// Compose each controller's velocity and write it to the physics body.
///
/// Runs after ground detection in the same tick.
pub fn apply_controller_velocity<B: CharacterPhysicsBackend>(world: &mut World) {
    let dt = B::get_fixed_timestep(world);
    let gravity = B::get_gravity(world);

    let velocities: Vec<(Entity, Vec3)> = world
        .query::<(Entity, &mut CharacterController)>()
        .iter_mut(world)
        .map(|(entity, mut controller)| (entity, controller.compose_velocity(gravity.y, dt)))
        .collect();

    for (entity, velocity) in velocities {
        B::set_velocity(world, entity, velocity);
    }
}

/// Sync state marker components with each controller's ground state.
pub fn sync_state_markers(
    mut commands: Commands,
    q_controllers: Query<(
        Entity,
        &CharacterController,
        Has<Grounded>,
        Has<Airborne>,
        Option<&OnSlope>,
    )>,
) {
    for (entity, controller, has_grounded, has_airborne, on_slope) in &q_controllers {
        let ground = controller.ground();

        // Sync Grounded/Airborne
        if ground.is_grounded && !has_grounded {
            debug!("{entity} landed");
            commands.entity(entity).insert(Grounded).remove::<Airborne>();
        } else if !ground.is_grounded && has_grounded {
            debug!("{entity} left the ground");
            commands.entity(entity).remove::<Grounded>().insert(Airborne);
        } else if !ground.is_grounded && !has_airborne {
            commands.entity(entity).insert(Airborne);
        }

        // Sync OnSlope
        match (ground.on_slope, ground.ground_normal, on_slope) {
            (true, Some(normal), _) => {
                let marker = OnSlope::new(normal, ground.slope_angle_deg);
                if on_slope.is_none_or(|current| current.normal != marker.normal) {
                    commands.entity(entity).insert(marker);
                }
            }
            (_, _, Some(_)) => {
                commands.entity(entity).remove::<OnSlope>();
            }
            _ => {}
        }
    }
}
