//! Collision layers.
//!
//! Every body carries a category bit and a mask. Two bodies interact only if
//! each mask accepts the other's category. The pair maps one-to-one onto
//! rapier's interaction groups (memberships, filter).

use rapier2d::prelude::{Group, InteractionGroups};
use serde::{Deserialize, Serialize};

use crate::protocol::FilterDescriptor;

pub const CATEGORY_DEFAULT: u32 = 0x0001;
/// Sensor zones (YUM / SPLASH).
pub const CATEGORY_SENSOR: u32 = 0x0002;
/// Ropes and vines.
pub const CATEGORY_ROPE: u32 = 0x0004;
pub const CATEGORY_CEILING: u32 = 0x0008;

pub const MASK_ALL: u32 = u32::MAX;

/// Layers the pointer can grab.
pub const POINTER_MASK: u32 = CATEGORY_DEFAULT | CATEGORY_ROPE;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CollisionFilter {
    pub category: u32,
    pub mask: u32,
}

impl Default for CollisionFilter {
    fn default() -> Self {
        Self {
            category: CATEGORY_DEFAULT,
            mask: MASK_ALL,
        }
    }
}

impl CollisionFilter {
    pub fn new(category: u32, mask: u32) -> Self {
        Self { category, mask }
    }

    pub fn sensor() -> Self {
        Self::new(CATEGORY_SENSOR, MASK_ALL)
    }

    /// Ropes hang through the ceiling.
    pub fn rope() -> Self {
        Self::new(CATEGORY_ROPE, MASK_ALL & !CATEGORY_CEILING)
    }

    pub fn ceiling() -> Self {
        Self::new(CATEGORY_CEILING, MASK_ALL & !CATEGORY_ROPE)
    }

    /// Collides with nothing.
    pub fn ghost(self) -> Self {
        Self::new(self.category, 0)
    }

    pub fn groups(&self) -> InteractionGroups {
        InteractionGroups::new(
            Group::from_bits_truncate(self.category),
            Group::from_bits_truncate(self.mask),
        )
    }

    pub fn can_collide(&self, other: &CollisionFilter) -> bool {
        (self.mask & other.category) != 0 && (other.mask & self.category) != 0
    }

    /// Overlay an authored `collisionFilter` on top of a layer default.
    pub fn with_overrides(self, desc: Option<&FilterDescriptor>) -> Self {
        match desc {
            Some(d) => Self::new(
                d.category.unwrap_or(self.category),
                d.mask.unwrap_or(self.mask),
            ),
            None => self,
        }
    }
}
