//! Body construction parameters and the per-body state mirrored out of the
//! simulation after every step.

use rapier2d::prelude::{
    point, vector, ActiveEvents, Collider, ColliderBuilder, ColliderHandle, MassProperties,
    RigidBodyBuilder, RigidBodyHandle, SharedShape,
};
use serde::{Deserialize, Serialize};

use super::filter::CollisionFilter;
use super::units;
use crate::protocol::BodyMetadata;
use crate::types::{Aabb, Vec2};

/// Inertia multiplier applied to bodies flagged `resistRotation`.
pub const RESIST_ROTATION_FACTOR: f32 = 40.0;

/// Stable handle to a body inside a [`super::PhysicsWorld`].
///
/// Handles are never reused, so comparing them orders bodies by creation.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyHandle(pub(crate) u64);

impl BodyHandle {
    pub(crate) fn user_data(self) -> u128 {
        self.0 as u128
    }
}

impl std::fmt::Display for BodyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Shape
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Shape {
    Circle { radius: f32 },
    Rectangle { width: f32, height: f32 },
}

impl Shape {
    pub fn area(&self) -> f32 {
        match *self {
            Shape::Circle { radius } => std::f32::consts::PI * radius * radius,
            Shape::Rectangle { width, height } => width * height,
        }
    }

    /// Moment of inertia about the centre for a body of mass `mass`.
    pub fn inertia(&self, mass: f32) -> f32 {
        match *self {
            Shape::Circle { radius } => 0.5 * mass * radius * radius,
            Shape::Rectangle { width, height } => mass * (width * width + height * height) / 12.0,
        }
    }

    pub fn aabb(&self, position: Vec2, angle: f32) -> Aabb {
        let half = match *self {
            Shape::Circle { radius } => Vec2::new(radius, radius),
            Shape::Rectangle { width, height } => {
                let (sin, cos) = angle.sin_cos();
                let (hw, hh) = (width * 0.5, height * 0.5);
                Vec2::new(
                    hw * cos.abs() + hh * sin.abs(),
                    hw * sin.abs() + hh * cos.abs(),
                )
            }
        };
        Aabb {
            min: position - half,
            max: position + half,
        }
    }

    fn collider_shape(&self) -> SharedShape {
        match *self {
            Shape::Circle { radius } => SharedShape::ball(radius),
            Shape::Rectangle { width, height } => SharedShape::cuboid(width * 0.5, height * 0.5),
        }
    }
}

// ---------------------------------------------------------------------------
// Construction parameters
// ---------------------------------------------------------------------------

/// Everything needed to create a body.
#[derive(Debug, Clone)]
pub struct BodyParams {
    pub label: String,
    pub shape: Shape,
    pub position: Vec2,
    pub angle: f32,
    pub is_static: bool,
    pub is_sensor: bool,
    pub density: f32,
    pub restitution: f32,
    pub friction: f32,
    /// Share of velocity lost per reference frame.
    pub friction_air: f32,
    pub filter: CollisionFilter,
    pub metadata: BodyMetadata,
}

impl BodyParams {
    pub fn new(label: impl Into<String>, shape: Shape, position: Vec2) -> Self {
        Self {
            label: label.into(),
            shape,
            position,
            angle: 0.0,
            is_static: false,
            is_sensor: false,
            density: 0.001,
            restitution: 0.0,
            friction: 0.1,
            friction_air: 0.01,
            filter: CollisionFilter::default(),
            metadata: BodyMetadata::default(),
        }
    }

    pub fn fixed(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn sensor(mut self) -> Self {
        self.is_static = true;
        self.is_sensor = true;
        self.filter = CollisionFilter::sensor();
        self
    }

    pub fn with_metadata(mut self, metadata: BodyMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_filter(mut self, filter: CollisionFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Mass and rotational inertia derived from shape and density.
    pub fn mass_properties(&self) -> (f32, f32) {
        let mass = (self.shape.area() * self.density).max(1e-6);
        let mut inertia = self.shape.inertia(mass).max(1e-6);
        if self.metadata.resist_rotation {
            inertia *= RESIST_ROTATION_FACTOR;
        }
        (mass, inertia)
    }

    pub(crate) fn rigid_body(&self, handle: BodyHandle) -> rapier2d::prelude::RigidBody {
        let builder = if self.is_static || self.is_sensor {
            RigidBodyBuilder::fixed()
        } else {
            let damping = units::damping_rate(self.friction_air);
            RigidBodyBuilder::dynamic()
                .linear_damping(damping)
                .angular_damping(damping)
        };
        builder
            .translation(vector![self.position.x, self.position.y])
            .rotation(self.angle)
            .user_data(handle.user_data())
            .build()
    }

    pub(crate) fn collider(&self, handle: BodyHandle) -> Collider {
        let builder = ColliderBuilder::new(self.shape.collider_shape())
            .sensor(self.is_sensor)
            .restitution(self.restitution)
            .friction(self.friction)
            .collision_groups(self.filter.groups())
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .user_data(handle.user_data());

        if self.is_static || self.is_sensor {
            builder.build()
        } else {
            let (mass, inertia) = self.mass_properties();
            builder
                .mass_properties(MassProperties::new(point![0.0, 0.0], mass, inertia))
                .build()
        }
    }
}

// ---------------------------------------------------------------------------
// Mirrored state
// ---------------------------------------------------------------------------

/// A body as the rest of the room sees it.
///
/// Pose and velocity are copied out of the simulation after each step and
/// whenever the world writes them. Velocities are in world units per
/// reference frame.
#[derive(Debug, Clone)]
pub struct BodyState {
    pub label: String,
    pub shape: Shape,
    pub position: Vec2,
    pub velocity: Vec2,
    pub angle: f32,
    pub angular_velocity: f32,
    pub mass: f32,
    pub is_static: bool,
    pub is_sensor: bool,
    pub filter: CollisionFilter,
    pub metadata: BodyMetadata,
    pub(crate) rigid_body: RigidBodyHandle,
    pub(crate) collider: ColliderHandle,
}

impl BodyState {
    pub(crate) fn new(
        params: BodyParams,
        rigid_body: RigidBodyHandle,
        collider: ColliderHandle,
    ) -> Self {
        let is_static = params.is_static || params.is_sensor;
        let (mass, _) = params.mass_properties();
        Self {
            label: params.label,
            shape: params.shape,
            position: params.position,
            velocity: Vec2::zero(),
            angle: params.angle,
            angular_velocity: 0.0,
            mass,
            is_static,
            is_sensor: params.is_sensor,
            filter: params.filter,
            metadata: params.metadata,
            rigid_body,
            collider,
        }
    }

    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }

    pub fn group(&self) -> Option<&str> {
        self.metadata.group.as_deref()
    }

    pub fn aabb(&self) -> Aabb {
        self.shape.aabb(self.position, self.angle)
    }

    /// Body-local offset to world space.
    pub fn world_point(&self, local: Vec2) -> Vec2 {
        self.position + local.rotate(self.angle)
    }

    /// World point to body-local offset.
    pub fn local_point(&self, world: Vec2) -> Vec2 {
        (world - self.position).rotate(-self.angle)
    }
}
