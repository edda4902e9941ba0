//! The rapier pipeline and its sets, plus the two helper bodies every room
//! needs: a fixed anchor at the origin for tethers and a kinematic body that
//! follows the pointer during a drag.

use rapier2d::crossbeam::channel::unbounded;
use rapier2d::prelude::{
    CCDSolver, ChannelEventCollector, ColliderHandle, ColliderSet, CollisionEvent,
    ContactForceEvent, DefaultBroadPhase, ImpulseJointSet, IntegrationParameters, IslandManager,
    MultibodyJointSet, NarrowPhase, PhysicsPipeline, Real, RigidBodyBuilder, RigidBodyHandle,
    RigidBodySet, Vector,
};

use super::collision::Contact;
use super::units;
use crate::types::Vec2;

pub(crate) struct Engine {
    pipeline: PhysicsPipeline,
    gravity: Vector<Real>,
    integration_params: IntegrationParameters,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    pub bodies: RigidBodySet,
    pub colliders: ColliderSet,
    pub impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    /// Fixed, collider-less body at the origin.
    pub world_anchor: RigidBodyHandle,
    /// Kinematic, collider-less body driven to the pointer.
    pub pointer_body: RigidBodyHandle,
}

impl Engine {
    pub fn new(gravity: Vector<Real>) -> Self {
        let mut bodies = RigidBodySet::new();
        let world_anchor = bodies.insert(RigidBodyBuilder::fixed().build());
        let pointer_body = bodies.insert(RigidBodyBuilder::kinematic_position_based().build());
        Self {
            pipeline: PhysicsPipeline::new(),
            gravity,
            integration_params: IntegrationParameters::default(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies,
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            world_anchor,
            pointer_body,
        }
    }

    pub fn insert(
        &mut self,
        body: rapier2d::prelude::RigidBody,
        collider: rapier2d::prelude::Collider,
    ) -> (RigidBodyHandle, ColliderHandle) {
        let body_handle = self.bodies.insert(body);
        let collider_handle =
            self.colliders
                .insert_with_parent(collider, body_handle, &mut self.bodies);
        (body_handle, collider_handle)
    }

    /// Remove a body with its collider and every joint attached to it.
    pub fn remove(&mut self, handle: RigidBodyHandle) {
        self.bodies.remove(
            handle,
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
    }

    /// Step by `dt` seconds and return the collider pairs that started
    /// touching or overlapping.
    pub fn step(&mut self, dt: f32) -> Vec<(ColliderHandle, ColliderHandle)> {
        self.integration_params.dt = dt;

        let (collision_send, collision_recv) = unbounded::<CollisionEvent>();
        let (force_send, _force_recv) = unbounded::<ContactForceEvent>();
        let event_handler = ChannelEventCollector::new(collision_send, force_send);

        self.pipeline.step(
            &self.gravity,
            &self.integration_params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            None,
            &(),
            &event_handler,
        );

        let mut started = Vec::new();
        while let Ok(event) = collision_recv.try_recv() {
            if let CollisionEvent::Started(h1, h2, _) = event {
                started.push((h1, h2));
            }
        }
        started
    }

    /// Contact geometry between two colliders, seen from `c1`.
    ///
    /// Sensor overlaps have no contact manifold; they report no contact.
    pub fn contact(&self, c1: ColliderHandle, c2: ColliderHandle) -> Option<Contact> {
        let pair = self.narrow_phase.contact_pair(c1, c2)?;
        let flip = pair.collider1 != c1;
        let manifold = pair
            .manifolds
            .iter()
            .find(|m| !m.data.solver_contacts.is_empty() || !m.points.is_empty())?;

        let normal = units::from_vector(&manifold.data.normal);
        let normal = if flip { -normal } else { normal };

        if let Some(solver) = manifold.data.solver_contacts.first() {
            return Some(Contact {
                normal,
                depth: -solver.dist,
                point: Vec2::new(solver.point.x, solver.point.y),
            });
        }

        let deepest = manifold.points.first()?;
        let collider1 = self.colliders.get(pair.collider1)?;
        let world = collider1.position() * deepest.local_p1;
        Some(Contact {
            normal,
            depth: -deepest.dist,
            point: Vec2::new(world.x, world.y),
        })
    }
}
