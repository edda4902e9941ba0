//! Discrete rule actions: removals, spawns and clings.

use log::debug;

use crate::error::{ActionError, RegistryError};
use crate::layout;
use crate::protocol::{BodySpawned, SpawnAt};
use crate::rules::compile::{Action, SpawnPlan};
use crate::rules::template::TemplateContext;
use crate::scene::Scene;
use crate::types::Vec2;

/// Bodies and positions an action may refer to.
///
/// Positions are captured before any action runs, so a `spawn` that follows
/// `removeSelf` still knows where the acting body was.
#[derive(Debug, Clone, Default)]
pub struct ActionContext {
    /// The acting body ("self").
    pub actor: Option<String>,
    pub other: Option<String>,
    pub actor_pos: Option<Vec2>,
    pub other_pos: Option<Vec2>,
    /// World-space contact point of a collision.
    pub contact: Option<Vec2>,
    /// Centre of a fired cluster.
    pub center: Option<Vec2>,
    /// Members of a fired cluster.
    pub members: Vec<String>,
}

impl ActionContext {
    pub fn collision(
        actor: &str,
        actor_pos: Vec2,
        other: &str,
        other_pos: Vec2,
        contact: Vec2,
    ) -> Self {
        Self {
            actor: Some(actor.to_string()),
            other: Some(other.to_string()),
            actor_pos: Some(actor_pos),
            other_pos: Some(other_pos),
            contact: Some(contact),
            ..Default::default()
        }
    }

    pub fn cluster(center: Vec2, members: Vec<String>) -> Self {
        Self {
            center: Some(center),
            members,
            ..Default::default()
        }
    }

    pub fn update(actor: &str, actor_pos: Vec2) -> Self {
        Self {
            actor: Some(actor.to_string()),
            actor_pos: Some(actor_pos),
            ..Default::default()
        }
    }

    pub fn actor(&self) -> Result<&str, ActionError> {
        self.actor.as_deref().ok_or(ActionError::NoSuchRole("self"))
    }

    pub fn other(&self) -> Result<&str, ActionError> {
        self.other.as_deref().ok_or(ActionError::NoSuchRole("other"))
    }

    /// Where anchored effects (popups, default spawns) appear.
    pub fn origin(&self) -> Option<Vec2> {
        self.center.or(self.actor_pos)
    }
}

pub fn apply(scene: &mut Scene, ctx: &ActionContext, action: &Action) -> Result<(), ActionError> {
    match action {
        Action::RemoveSelf => remove(scene, ctx.actor()?),
        Action::RemoveOther => remove(scene, ctx.other()?),
        Action::RemoveGroup => {
            for id in &ctx.members {
                if !scene.remove_body(id) {
                    debug!("Cluster member '{}' already gone", id);
                }
            }
            Ok(())
        }
        Action::Cling { stiffness } => cling(scene, ctx, *stiffness),
        Action::Spawn(plan) => spawn(scene, ctx, plan).map(|_| ()),
        // Steering runs through `rules::steering`.
        Action::Seek(_) | Action::ExitPath(_) => Ok(()),
    }
}

fn remove(scene: &mut Scene, id: &str) -> Result<(), ActionError> {
    if scene.remove_body(id) {
        Ok(())
    } else {
        Err(ActionError::MissingBody(id.to_string()))
    }
}

fn cling(scene: &mut Scene, ctx: &ActionContext, stiffness: Option<f32>) -> Result<(), ActionError> {
    let (actor, other) = (ctx.actor()?, ctx.other()?);
    let body = scene
        .bodies
        .handle_of(actor)
        .ok_or_else(|| ActionError::MissingBody(actor.to_string()))?;
    let anchor = scene
        .bodies
        .handle_of(other)
        .ok_or_else(|| ActionError::MissingBody(other.to_string()))?;
    let contact = ctx
        .contact
        .or(ctx.other_pos)
        .ok_or(ActionError::NoSuchRole("other"))?;

    let physics = scene.bodies.physics_mut();
    let stiffness = stiffness.unwrap_or(physics.config().cling_stiffness);
    physics
        .cling(body, anchor, contact, stiffness)
        .map(|_| ())
        .ok_or_else(|| ActionError::MissingBody(other.to_string()))
}

/// Create a new body from a spawn plan. Returns the new id.
pub fn spawn(scene: &mut Scene, ctx: &ActionContext, plan: &SpawnPlan) -> Result<String, ActionError> {
    let position = match plan.at {
        SpawnAt::Actor => ctx.origin().ok_or(ActionError::NoSuchRole("self"))?,
        SpawnAt::Other => ctx
            .other_pos
            .or(ctx.center)
            .ok_or(ActionError::NoSuchRole("other"))?,
    };

    let seq = scene.spawn_seq;
    scene.spawn_seq += 1;
    let tctx = TemplateContext {
        id: ctx.actor.as_deref().unwrap_or_default(),
        timestamp_ms: scene.clock.timestamp_ms,
        tick: scene.clock.tick,
        seq,
    };

    let id = plan.id.render(&tctx);
    if scene.bodies.contains(&id) {
        return Err(RegistryError::DuplicateId(id).into());
    }

    let mut metadata = plan.metadata.clone();
    let timed = metadata
        .group
        .as_ref()
        .is_some_and(|g| scene.timed_groups.contains(g));
    if timed {
        metadata.spawn_time = Some(scene.clock.elapsed_ms);
    }

    let texture = match &plan.texture {
        Some(t) => Some(t.render(&tctx)),
        None => plan.options.texture().map(str::to_string),
    };
    let params = layout::params_from(&id, plan.shape, position, &plan.options, &metadata);
    scene.bodies.register(id.clone(), params, texture)?;

    debug!("Spawned '{}' at {}", id, position);
    scene.effects.spawned.push(BodySpawned {
        body_id: id.clone(),
        group: metadata.group,
        x: position.x,
        y: position.y,
    });
    Ok(id)
}
