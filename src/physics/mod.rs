//! Physics adapter: a rapier2d world with the room invariants layered on top.
//!
//! ## Step order
//!
//! ```text
//! advance(delta_ms)
//!   1. tether stretch check      → detach over-stretched tethers
//!   2. speed cap                 → |v| ≤ max_speed for every dynamic body
//!   3. rapier step               → gravity, springs, contacts, sensor overlaps
//!      collision starts          → paired with pre-step velocities
//!      mirror state              → pose and velocity copied out
//!      snap attachments          → clung bodies follow their anchor
//!   4. hover wiggle + drag latch
//! ```
//!
//! Velocities are in world units per reference frame ([`REFERENCE_FRAME_MS`]),
//! so authored thresholds (`impactSpeed`, `stillThreshold`, `max_speed`) do
//! not depend on the tick rate.

pub mod body;
pub mod collision;
pub mod constraint;
mod engine;
pub mod filter;
pub mod pointer;
pub mod units;

use log::{debug, trace};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rapier2d::parry::query::PointQuery;
use rapier2d::prelude::{vector, Isometry};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub use body::{BodyHandle, BodyParams, BodyState, Shape};
pub use collision::{CollisionStart, Contact};
pub use constraint::{Attachment, ClingJoint, ConstraintId, DragBinding, Tether};
pub use filter::CollisionFilter;
pub use pointer::{PointerState, Viewport};

use engine::Engine;
use rapier2d::prelude::ColliderHandle;

use crate::types::Vec2;

/// Duration of one reference frame; velocities are measured per frame.
pub const REFERENCE_FRAME_MS: f32 = 1000.0 / 60.0;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Gravity direction and strength (multiplied by `gravity_scale`).
    pub gravity: Vec2,
    /// Units per ms² per unit of `gravity`.
    pub gravity_scale: f32,
    /// Speed cap for every dynamic body, units per reference frame.
    pub max_speed: f32,
    pub tether_stiffness: f32,
    pub tether_damping: f32,
    /// Default tether max stretch.
    pub tether_max_stretch: f32,
    /// Max stretch for bodies flagged `clingToOrigin`.
    pub cling_to_origin_stretch: f32,
    pub cling_stiffness: f32,
    pub drag_stiffness: f32,
    pub drag_damping: f32,
    /// Wiggle acceleration, units per ms².
    pub wiggle_force: f32,
    /// Consecutive drag ticks that end the wiggle phase.
    pub drag_start_ticks: u32,
    /// Seed for wiggle directions.
    pub seed: u64,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vec2::new(0.0, 1.0),
            gravity_scale: 0.001,
            max_speed: 50.0,
            tether_stiffness: 0.02,
            tether_damping: 0.05,
            tether_max_stretch: 15.0,
            cling_to_origin_stretch: 100.0,
            cling_stiffness: 0.05,
            drag_stiffness: 0.2,
            drag_damping: 0.1,
            wiggle_force: 0.0035,
            drag_start_ticks: 15,
            seed: 42,
        }
    }
}

// ---------------------------------------------------------------------------
// Step output
// ---------------------------------------------------------------------------

/// Everything a single [`PhysicsWorld::advance`] produced.
#[derive(Debug, Default)]
pub struct StepReport {
    pub collisions: Vec<CollisionStart>,
    /// Bodies whose tether snapped this step.
    pub detached_tethers: Vec<BodyHandle>,
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

pub struct PhysicsWorld {
    config: PhysicsConfig,
    engine: Engine,
    /// Ordered by handle, i.e. by creation order.
    bodies: BTreeMap<BodyHandle, BodyState>,
    by_collider: HashMap<ColliderHandle, BodyHandle>,
    next_handle: u64,
    tethers: Vec<Tether>,
    joints: Vec<ClingJoint>,
    attachments: Vec<Attachment>,
    next_constraint: u64,
    pointer: PointerState,
    rng: StdRng,
}

impl PhysicsWorld {
    pub fn new(config: PhysicsConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        let engine = Engine::new(Self::sim_gravity(&config));
        Self {
            config,
            engine,
            bodies: BTreeMap::new(),
            by_collider: HashMap::new(),
            next_handle: 1,
            tethers: Vec::new(),
            joints: Vec::new(),
            attachments: Vec::new(),
            next_constraint: 1,
            pointer: PointerState::default(),
            rng,
        }
    }

    fn sim_gravity(config: &PhysicsConfig) -> rapier2d::prelude::Vector<f32> {
        units::to_sim_acceleration(config.gravity * config.gravity_scale)
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Bodies
    // -----------------------------------------------------------------------

    pub fn insert(&mut self, params: BodyParams) -> BodyHandle {
        let handle = BodyHandle(self.next_handle);
        self.next_handle += 1;

        let (rigid_body, collider) = self
            .engine
            .insert(params.rigid_body(handle), params.collider(handle));
        self.by_collider.insert(collider, handle);
        self.bodies
            .insert(handle, BodyState::new(params, rigid_body, collider));
        handle
    }

    /// Remove a body together with every constraint that references it.
    pub fn remove(&mut self, handle: BodyHandle) -> Option<BodyState> {
        let body = self.bodies.remove(&handle)?;
        self.by_collider.remove(&body.collider);
        self.engine.remove(body.rigid_body);

        self.tethers.retain(|t| t.body != handle);
        self.joints
            .retain(|j| j.body != handle && j.anchor_body != handle);
        self.attachments
            .retain(|a| a.body != handle && a.anchor_body != handle);
        if self.pointer.drag.as_ref().is_some_and(|d| d.body == handle) {
            self.pointer.release();
        }

        trace!("Removed body {} ({})", handle, body.label);
        Some(body)
    }

    pub fn get(&self, handle: BodyHandle) -> Option<&BodyState> {
        self.bodies.get(&handle)
    }

    /// All bodies in creation order.
    pub fn bodies(&self) -> impl Iterator<Item = (BodyHandle, &BodyState)> {
        self.bodies.iter().map(|(h, b)| (*h, b))
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Dynamic bodies whose collider contains `p`, in creation order.
    pub fn query_point(&self, p: Vec2) -> Vec<BodyHandle> {
        self.bodies
            .iter()
            .filter(|(_, b)| !b.is_static && self.collider_contains(b, p))
            .map(|(h, _)| *h)
            .collect()
    }

    fn collider_contains(&self, body: &BodyState, p: Vec2) -> bool {
        self.engine
            .colliders
            .get(body.collider)
            .is_some_and(|c| c.shape().contains_point(c.position(), &units::to_point(p)))
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Set a dynamic body's velocity, in units per reference frame.
    pub fn set_velocity(&mut self, handle: BodyHandle, velocity: Vec2) -> bool {
        let Some(body) = self.bodies.get_mut(&handle) else {
            return false;
        };
        if body.is_static {
            return false;
        }
        let Some(rb) = self.engine.bodies.get_mut(body.rigid_body) else {
            return false;
        };
        rb.set_linvel(units::to_sim_velocity(velocity), true);
        body.velocity = velocity;
        true
    }

    /// Move a body, keeping its angle.
    pub fn set_position(&mut self, handle: BodyHandle, position: Vec2) -> bool {
        let Some(angle) = self.bodies.get(&handle).map(|b| b.angle) else {
            return false;
        };
        self.set_pose(handle, position, angle)
    }

    pub fn set_pose(&mut self, handle: BodyHandle, position: Vec2, angle: f32) -> bool {
        let Some(body) = self.bodies.get_mut(&handle) else {
            return false;
        };
        let Some(rb) = self.engine.bodies.get_mut(body.rigid_body) else {
            return false;
        };
        rb.set_position(Isometry::new(vector![position.x, position.y], angle), true);
        body.position = position;
        body.angle = angle;
        true
    }

    /// Zero the angle and spin of a body.
    pub fn set_upright(&mut self, handle: BodyHandle) -> bool {
        let Some(position) = self.bodies.get(&handle).map(|b| b.position) else {
            return false;
        };
        if !self.set_pose(handle, position, 0.0) {
            return false;
        }
        if let Some(body) = self.bodies.get_mut(&handle) {
            if let Some(rb) = self.engine.bodies.get_mut(body.rigid_body) {
                rb.set_angvel(0.0, true);
            }
            body.angular_velocity = 0.0;
        }
        true
    }

    pub fn set_filter(&mut self, handle: BodyHandle, filter: CollisionFilter) -> bool {
        let Some(body) = self.bodies.get_mut(&handle) else {
            return false;
        };
        let Some(collider) = self.engine.colliders.get_mut(body.collider) else {
            return false;
        };
        collider.set_collision_groups(filter.groups());
        body.filter = filter;
        true
    }

    pub fn metadata_mut(&mut self, handle: BodyHandle) -> Option<&mut crate::protocol::BodyMetadata> {
        self.bodies.get_mut(&handle).map(|b| &mut b.metadata)
    }

    // -----------------------------------------------------------------------
    // Tethers
    // -----------------------------------------------------------------------

    /// Leash `handle` to its current position.
    pub fn add_tether(&mut self, handle: BodyHandle, max_stretch: f32) -> Option<ConstraintId> {
        let body = self.bodies.get(&handle)?;
        if body.is_static {
            return None;
        }
        let anchor = body.position;
        let (stiffness, damping) = (self.config.tether_stiffness, self.config.tether_damping);
        let joint = self.engine.impulse_joints.insert(
            self.engine.world_anchor,
            body.rigid_body,
            constraint::spring(anchor, Vec2::zero(), stiffness, damping),
            true,
        );

        let id = self.next_constraint_id();
        self.tethers.push(Tether {
            id,
            body: handle,
            anchor,
            stiffness,
            damping,
            max_stretch,
            joint,
        });
        Some(id)
    }

    pub fn tether_of(&self, handle: BodyHandle) -> Option<&Tether> {
        self.tethers.iter().find(|t| t.body == handle)
    }

    pub fn tethers(&self) -> &[Tether] {
        &self.tethers
    }

    // -----------------------------------------------------------------------
    // Cling
    // -----------------------------------------------------------------------

    /// Pin `body` to the world point `contact` on `anchor_body`.
    ///
    /// Replaces any earlier cling of `body` and drops its spawn tether.
    pub fn cling(
        &mut self,
        body: BodyHandle,
        anchor_body: BodyHandle,
        contact: Vec2,
        stiffness: f32,
    ) -> Option<ConstraintId> {
        if body == anchor_body {
            return None;
        }
        let b = self.bodies.get(&body)?;
        let anchor = self.bodies.get(&anchor_body)?;
        let attachment = Attachment::capture(body, anchor_body, b, anchor);
        let anchor_local = anchor.local_point(contact);
        let spring = constraint::spring(anchor_local, b.local_point(contact), stiffness, 0.0);
        let (anchor_rb, body_rb) = (anchor.rigid_body, b.rigid_body);

        let engine = &mut self.engine;
        self.joints.retain(|j| {
            let keep = j.body != body;
            if !keep {
                engine.impulse_joints.remove(j.joint, true);
            }
            keep
        });
        self.tethers.retain(|t| {
            let keep = t.body != body;
            if !keep {
                engine.impulse_joints.remove(t.joint, true);
            }
            keep
        });
        self.attachments.retain(|a| a.body != body);

        let joint = self
            .engine
            .impulse_joints
            .insert(anchor_rb, body_rb, spring, true);
        let id = self.next_constraint_id();
        self.joints.push(ClingJoint {
            id,
            body,
            anchor_body,
            anchor_local,
            stiffness,
            joint,
        });
        self.attachments.push(attachment);
        debug!("Body {} clings to {} at {}", body, anchor_body, contact);
        Some(id)
    }

    pub fn attachment_of(&self, handle: BodyHandle) -> Option<&Attachment> {
        self.attachments.iter().find(|a| a.body == handle)
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    pub fn joints(&self) -> &[ClingJoint] {
        &self.joints
    }

    // -----------------------------------------------------------------------
    // Pointer
    // -----------------------------------------------------------------------

    pub fn pointer(&self) -> &PointerState {
        &self.pointer
    }

    pub fn pointer_move(&mut self, p: Vec2) {
        self.pointer.hover = Some(p);
    }

    /// Try to grab the topmost grabbable body under `p`.
    ///
    /// Bodies whose metadata says `clickable: false` refuse the grab and no
    /// binding is kept.
    pub fn pointer_down(&mut self, p: Vec2) -> Option<BodyHandle> {
        self.pointer.hover = Some(p);
        self.release_drag();

        let (handle, body) = self.bodies.iter().rev().find(|(_, b)| {
            !b.is_static
                && (b.filter.category & filter::POINTER_MASK) != 0
                && self.collider_contains(b, p)
        })?;

        if body.metadata.clickable == Some(false) {
            debug!("Grab rejected: {} is not clickable", body.label);
            return None;
        }

        let handle = *handle;
        let local_point = body.local_point(p);
        let body_rb = body.rigid_body;
        let stiffness = self.config.drag_stiffness;

        let pointer_rb = self.engine.pointer_body;
        if let Some(rb) = self.engine.bodies.get_mut(pointer_rb) {
            rb.set_translation(vector![p.x, p.y], true);
        }
        let joint = self.engine.impulse_joints.insert(
            pointer_rb,
            body_rb,
            constraint::spring(Vec2::zero(), local_point, stiffness, self.config.drag_damping),
            true,
        );

        self.pointer.drag = Some(DragBinding {
            body: handle,
            local_point,
            stiffness,
            joint,
        });
        Some(handle)
    }

    pub fn pointer_up(&mut self) -> Option<BodyHandle> {
        self.release_drag()
    }

    fn release_drag(&mut self) -> Option<BodyHandle> {
        let released = self.pointer.release()?;
        self.engine.impulse_joints.remove(released.joint, true);
        Some(released.body)
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Drop every body and constraint and reset the pointer latches.
    pub fn clear(&mut self) {
        self.engine = Engine::new(Self::sim_gravity(&self.config));
        self.bodies.clear();
        self.by_collider.clear();
        self.tethers.clear();
        self.joints.clear();
        self.attachments.clear();
        self.pointer.reset();
        self.rng = StdRng::seed_from_u64(self.config.seed);
    }

    // -----------------------------------------------------------------------
    // Step
    // -----------------------------------------------------------------------

    pub fn advance(&mut self, delta_ms: f32) -> StepReport {
        let mut report = StepReport::default();

        self.check_tethers(&mut report);
        self.clamp_speeds();
        self.drive_pointer();

        let started = self.engine.step(delta_ms / 1000.0);
        report.collisions = self.collision_starts(started);
        self.mirror_state();
        self.snap_attachments();
        self.wiggle(delta_ms);

        report
    }

    fn check_tethers(&mut self, report: &mut StepReport) {
        let (bodies, engine) = (&self.bodies, &mut self.engine);
        self.tethers.retain(|t| {
            let Some(body) = bodies.get(&t.body) else {
                return false;
            };
            let stretch = t.stretch(body);
            if stretch > t.max_stretch {
                debug!(
                    "Tether of {} snapped ({:.1} > {:.1})",
                    t.body, stretch, t.max_stretch
                );
                engine.impulse_joints.remove(t.joint, true);
                report.detached_tethers.push(t.body);
                false
            } else {
                true
            }
        });
    }

    fn clamp_speeds(&mut self) {
        let max = self.config.max_speed;
        for body in self.bodies.values_mut().filter(|b| !b.is_static) {
            let speed = body.speed();
            if speed <= max {
                continue;
            }
            body.velocity = body.velocity * (max / speed);
            if let Some(rb) = self.engine.bodies.get_mut(body.rigid_body) {
                rb.set_linvel(units::to_sim_velocity(body.velocity), true);
            }
        }
    }

    fn drive_pointer(&mut self) {
        if let (Some(_), Some(hover)) = (self.pointer.drag.as_ref(), self.pointer.hover) {
            if let Some(rb) = self.engine.bodies.get_mut(self.engine.pointer_body) {
                rb.set_next_kinematic_translation(vector![hover.x, hover.y]);
            }
        }
    }

    /// Pair each started contact with the velocities mirrored before the step.
    fn collision_starts(&self, started: Vec<(ColliderHandle, ColliderHandle)>) -> Vec<CollisionStart> {
        let mut events: Vec<CollisionStart> = started
            .into_iter()
            .filter_map(|(c1, c2)| {
                let (h1, h2) = (*self.by_collider.get(&c1)?, *self.by_collider.get(&c2)?);
                let ((a, ca), (b, cb)) = if h1 < h2 {
                    ((h1, c1), (h2, c2))
                } else {
                    ((h2, c2), (h1, c1))
                };
                let (body_a, body_b) = (self.bodies.get(&a)?, self.bodies.get(&b)?);
                let contact = self.engine.contact(ca, cb).unwrap_or_else(|| {
                    let point = if body_a.is_sensor {
                        body_b.position
                    } else if body_b.is_sensor {
                        body_a.position
                    } else {
                        (body_a.position + body_b.position) * 0.5
                    };
                    Contact {
                        normal: (body_b.position - body_a.position).normalize(),
                        depth: 0.0,
                        point,
                    }
                });
                Some(CollisionStart {
                    a,
                    b,
                    contact,
                    a_velocity: body_a.velocity,
                    b_velocity: body_b.velocity,
                })
            })
            .collect();
        events.sort_by_key(|e| (e.a, e.b));
        events.dedup_by_key(|e| (e.a, e.b));
        events
    }

    /// Copy pose and velocity of every dynamic body out of the simulation.
    fn mirror_state(&mut self) {
        for body in self.bodies.values_mut().filter(|b| !b.is_static) {
            let Some(rb) = self.engine.bodies.get(body.rigid_body) else {
                continue;
            };
            body.position = units::from_vector(rb.translation());
            body.angle = rb.rotation().angle();
            body.velocity = units::from_sim_velocity(rb.linvel());
            body.angular_velocity = rb.angvel() * units::FRAME_SECS;
        }
    }

    fn snap_attachments(&mut self) {
        let poses: Vec<(BodyHandle, Vec2, f32, Vec2)> = self
            .attachments
            .iter()
            .filter_map(|a| {
                let anchor = self.bodies.get(&a.anchor_body)?;
                let (position, angle) = a.target_pose(anchor);
                Some((a.body, position, angle, anchor.velocity))
            })
            .collect();

        for (handle, position, angle, velocity) in poses {
            self.set_pose(handle, position, angle);
            self.set_velocity(handle, velocity);
            if let Some(body) = self.bodies.get_mut(&handle) {
                if let Some(rb) = self.engine.bodies.get_mut(body.rigid_body) {
                    rb.set_angvel(0.0, true);
                }
                body.angular_velocity = 0.0;
            }
        }
    }

    fn wiggle(&mut self, delta_ms: f32) {
        if !self.pointer.sandbox_started {
            if let Some(hover) = self.pointer.hover {
                let kick = self.config.wiggle_force * delta_ms * REFERENCE_FRAME_MS;
                for handle in self.query_point(hover) {
                    let angle = self.rng.gen_range(0.0..std::f32::consts::TAU);
                    let Some(velocity) = self.bodies.get(&handle).map(|b| b.velocity) else {
                        continue;
                    };
                    self.set_velocity(handle, velocity + Vec2::new(angle.cos(), angle.sin()) * kick);
                }
            }
        }
        self.pointer.tick_drag(self.config.drag_start_ticks);
    }

    fn next_constraint_id(&mut self) -> ConstraintId {
        let id = ConstraintId(self.next_constraint);
        self.next_constraint += 1;
        id
    }
}
