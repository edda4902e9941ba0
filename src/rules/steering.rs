//! Per-tick steering behaviours driven by `update` rules.

use std::f32::consts::TAU;

use log::debug;

use crate::error::ActionError;
use crate::physics::REFERENCE_FRAME_MS;
use crate::protocol::{ExitPathDescriptor, SeekDescriptor};
use crate::rules::actions::ActionContext;
use crate::scene::Scene;
use crate::types::Vec2;

/// Nearest member of `group` to `from`, excluding `exclude`.
pub fn nearest_in_group(scene: &Scene, group: &str, from: Vec2, exclude: &str) -> Option<Vec2> {
    scene
        .bodies
        .all_with_group(group)
        .filter(|(id, _)| *id != exclude)
        .map(|(_, b)| b.position)
        .min_by(|a, b| a.distance(from).total_cmp(&b.distance(from)))
}

/// Chase the nearest body of `seek.target` at a fixed speed.
pub fn seek(scene: &mut Scene, ctx: &ActionContext, seek: &SeekDescriptor) -> Result<(), ActionError> {
    let id = ctx.actor()?;
    let position = scene
        .bodies
        .get(id)
        .map(|b| b.position)
        .ok_or_else(|| ActionError::MissingBody(id.to_string()))?;
    let target = nearest_in_group(scene, &seek.target, position, id);
    let handle = scene
        .bodies
        .handle_of(id)
        .ok_or_else(|| ActionError::MissingBody(id.to_string()))?;

    let mut velocity = match target {
        Some(t) if t.distance(position) > seek.stop_distance => {
            (t - position).normalize() * seek.speed
        }
        _ => Vec2::zero(),
    };

    let physics = scene.bodies.physics_mut();
    if let Some(floor) = seek.floor_y {
        if position.y > floor {
            physics.set_position(handle, Vec2::new(position.x, floor));
        }
        if velocity.y > 0.0 {
            velocity.y = 0.0;
        }
    }

    physics.set_upright(handle);
    physics.set_velocity(handle, velocity);
    Ok(())
}

/// Vertical velocity of the exit wave `t` ms after spawn.
pub fn wave_velocity(amplitude: f32, frequency_hz: f32, t_ms: f64) -> f32 {
    let omega = TAU * frequency_hz / 1000.0;
    amplitude * omega * (omega * t_ms as f32).cos() * REFERENCE_FRAME_MS
}

/// Drift off screen on a sine wave, then disappear.
pub fn exit_path(
    scene: &mut Scene,
    ctx: &ActionContext,
    exit: &ExitPathDescriptor,
) -> Result<(), ActionError> {
    let id = ctx.actor()?;
    let now = scene.clock.elapsed_ms;

    let handle = scene
        .bodies
        .handle_of(id)
        .ok_or_else(|| ActionError::MissingBody(id.to_string()))?;
    let physics = scene.bodies.physics_mut();
    let Some(metadata) = physics.metadata_mut(handle) else {
        return Err(ActionError::MissingBody(id.to_string()));
    };
    let spawned = *metadata.spawn_time.get_or_insert(now);
    let t = (now - spawned).max(0.0);

    physics.set_velocity(
        handle,
        Vec2::new(exit.drift_x, wave_velocity(exit.amplitude, exit.frequency, t)),
    );
    if exit.ghost {
        if let Some(filter) = physics.get(handle).map(|b| b.filter.ghost()) {
            physics.set_filter(handle, filter);
        }
    }
    let Some(position) = physics.get(handle).map(|b| b.position) else {
        return Err(ActionError::MissingBody(id.to_string()));
    };

    if scene.frame.is_outside(position) {
        debug!("'{}' left the room at {}", id, position);
        scene.remove_body(id);
    }
    Ok(())
}
