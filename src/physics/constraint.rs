//! Spring constraints: spawn-point tethers, cling joints and the pointer drag.
//!
//! All three are zero-rest-length spring joints in the simulation. Stiffness
//! and damping are authored as per-frame fractions and converted to spring
//! rates when the joint is built.

use rapier2d::prelude::{ImpulseJointHandle, MotorModel, SpringJointBuilder};

use super::body::{BodyHandle, BodyState};
use super::units;
use crate::types::Vec2;

/// Stable id of a tether or joint.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ConstraintId(pub(crate) u64);

/// Breakable leash from a body to a fixed world point.
#[derive(Debug, Clone)]
pub struct Tether {
    pub id: ConstraintId,
    pub body: BodyHandle,
    pub anchor: Vec2,
    pub stiffness: f32,
    pub damping: f32,
    /// Distance past which the tether is removed.
    pub max_stretch: f32,
    pub(crate) joint: ImpulseJointHandle,
}

impl Tether {
    pub fn stretch(&self, body: &BodyState) -> f32 {
        body.position.distance(self.anchor)
    }
}

/// Zero-length joint pinning `body` to a point fixed on `anchor_body`.
#[derive(Debug, Clone)]
pub struct ClingJoint {
    pub id: ConstraintId,
    pub body: BodyHandle,
    pub anchor_body: BodyHandle,
    /// Contact point in `anchor_body`'s local frame.
    pub anchor_local: Vec2,
    pub stiffness: f32,
    pub(crate) joint: ImpulseJointHandle,
}

/// Pose lock applied after every step: `body` keeps the offset and relative
/// angle it had to `anchor_body` when the cling formed.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub body: BodyHandle,
    pub anchor_body: BodyHandle,
    pub offset_local: Vec2,
    pub angle_offset: f32,
}

impl Attachment {
    pub fn capture(body: BodyHandle, anchor_body: BodyHandle, b: &BodyState, anchor: &BodyState) -> Self {
        Self {
            body,
            anchor_body,
            offset_local: anchor.local_point(b.position),
            angle_offset: b.angle - anchor.angle,
        }
    }

    /// Pose `body` should take given where `anchor` is now.
    pub fn target_pose(&self, anchor: &BodyState) -> (Vec2, f32) {
        (
            anchor.world_point(self.offset_local),
            anchor.angle + self.angle_offset,
        )
    }
}

/// Active pointer grab.
#[derive(Debug, Clone)]
pub struct DragBinding {
    pub body: BodyHandle,
    /// Grab point in the body's local frame.
    pub local_point: Vec2,
    pub stiffness: f32,
    pub(crate) joint: ImpulseJointHandle,
}

/// Zero-length spring between a point on body 1 and a point on body 2.
///
/// Contacts between the two bodies are disabled while the joint exists.
pub(crate) fn spring(
    anchor1: Vec2,
    anchor2: Vec2,
    stiffness: f32,
    damping: f32,
) -> SpringJointBuilder {
    SpringJointBuilder::new(0.0, units::spring_rate(stiffness), units::damping_rate(damping))
        .spring_model(MotorModel::AccelerationBased)
        .local_anchor1(units::to_point(anchor1))
        .local_anchor2(units::to_point(anchor2))
        .contacts_enabled(false)
}
