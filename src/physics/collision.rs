//! Collision-start events handed to the room.

use super::body::BodyHandle;
use crate::types::Vec2;

/// Contact geometry of a touching pair. `normal` points from body A to body B.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub normal: Vec2,
    pub depth: f32,
    /// World-space point on the touching surfaces.
    pub point: Vec2,
}

/// Two bodies that started touching during a step.
///
/// Velocities are the ones the bodies carried into the step, before the
/// solver resolved the contact, so `impactSpeed` sees the approach speed.
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionStart {
    /// The older of the two bodies.
    pub a: BodyHandle,
    pub b: BodyHandle,
    pub contact: Contact,
    pub a_velocity: Vec2,
    pub b_velocity: Vec2,
}

impl CollisionStart {
    pub fn velocity_of(&self, handle: BodyHandle) -> Option<Vec2> {
        if handle == self.a {
            Some(self.a_velocity)
        } else if handle == self.b {
            Some(self.b_velocity)
        } else {
            None
        }
    }
}
