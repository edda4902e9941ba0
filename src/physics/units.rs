//! Conversions between room units and simulation units.
//!
//! Rooms are authored in world units per reference frame (velocities) and
//! per-frame fractions (stiffness, damping, air friction). The simulation
//! runs in seconds.

use rapier2d::prelude::{vector, Real, Vector};

use super::REFERENCE_FRAME_MS;
use crate::types::Vec2;

/// Seconds per reference frame.
pub const FRAME_SECS: f32 = REFERENCE_FRAME_MS / 1000.0;

pub fn to_sim_velocity(v: Vec2) -> Vector<Real> {
    vector![v.x / FRAME_SECS, v.y / FRAME_SECS]
}

pub fn from_sim_velocity(v: &Vector<Real>) -> Vec2 {
    Vec2::new(v.x * FRAME_SECS, v.y * FRAME_SECS)
}

/// Acceleration in units/ms² to units/s².
pub fn to_sim_acceleration(a: Vec2) -> Vector<Real> {
    vector![a.x * 1.0e6, a.y * 1.0e6]
}

/// Constraint passes per reference frame that authored stiffness assumes.
pub const CONSTRAINT_PASSES: f32 = 2.0;

/// Pull fraction per constraint pass to a spring rate in 1/s².
pub fn spring_rate(fraction: f32) -> f32 {
    CONSTRAINT_PASSES * fraction / (FRAME_SECS * FRAME_SECS)
}

/// Velocity share lost per frame to a damping rate in 1/s.
pub fn damping_rate(fraction: f32) -> f32 {
    fraction / FRAME_SECS
}

pub fn to_point(p: Vec2) -> rapier2d::prelude::Point<Real> {
    rapier2d::prelude::point![p.x, p.y]
}

pub fn from_vector(v: &Vector<Real>) -> Vec2 {
    Vec2::new(v.x, v.y)
}
