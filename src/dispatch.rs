//! Rule evaluation against physics events.
//!
//! [`InteractionDispatcher`] is the [`StepHooks`] implementation installed for
//! a loaded room. Collision rules react to collision-start events, cluster
//! rules and update rules are evaluated once per tick.

use log::{debug, trace};

use crate::physics::CollisionStart;
use crate::protocol::RuleEventFired;
use crate::rules::{ActionContext, CompiledRule, RuleSet};
use crate::scene::{Scene, StepHooks};
use crate::types::{Aabb, Vec2};

pub struct InteractionDispatcher {
    rules: RuleSet,
    /// One flag per cluster rule; set once, cleared only by [`reset`](Self::reset).
    fired: Vec<bool>,
}

impl InteractionDispatcher {
    pub fn new(rules: RuleSet) -> Self {
        let fired = vec![false; rules.cluster.len()];
        Self { rules, fired }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn fired_count(&self) -> usize {
        self.fired.iter().filter(|f| **f).count()
    }

    /// Re-arm every cluster rule.
    pub fn reset(&mut self) {
        self.fired.iter_mut().for_each(|f| *f = false);
    }

    fn dispatch_collision(&self, scene: &mut Scene, event: &CollisionStart) {
        let (Some(id_a), Some(id_b)) = (
            scene.bodies.id_of(event.a).map(str::to_string),
            scene.bodies.id_of(event.b).map(str::to_string),
        ) else {
            // One side was removed earlier this tick, or is an unnamed fixture.
            return;
        };
        let (Some(a), Some(b)) = (scene.bodies.get(&id_a), scene.bodies.get(&id_b)) else {
            return;
        };

        let Some(rule) = self.rules.collision.iter().find(|r| {
            if !r.matches(a.group(), b.group()) {
                return false;
            }
            let (actor, other) = if r.is_actor(a.group()) {
                (event.a_velocity, event.b_velocity)
            } else {
                (event.b_velocity, event.a_velocity)
            };
            r.condition_met(actor, other)
        }) else {
            return;
        };

        let (actor_id, actor, other_id, other) = if rule.is_actor(a.group()) {
            (&id_a, a, &id_b, b)
        } else {
            (&id_b, b, &id_a, a)
        };
        trace!("Rule {} matched '{}' / '{}'", rule.index, actor_id, other_id);

        let ctx = ActionContext::collision(
            actor_id,
            actor.position,
            other_id,
            other.position,
            event.contact.point,
        );
        Self::fire_rule(scene, rule, &ctx);

        if let Some(name) = &rule.emit_event {
            scene.effects.rule_events.push(RuleEventFired {
                name: name.clone(),
                body_id: actor_id.clone(),
                rule: rule.index,
            });
        }
    }

    fn evaluate_clusters(&mut self, scene: &mut Scene) {
        let Self { rules, fired } = self;

        for (rule, fired) in rules.cluster.iter().zip(fired.iter_mut()) {
            if *fired {
                continue;
            }
            let Some(params) = rule.cluster else {
                continue;
            };

            let members: Vec<(String, Vec2, f32)> = scene
                .bodies
                .all_with_group(rule.groups.primary())
                .map(|(id, b)| (id.to_string(), b.position, b.speed()))
                .collect();
            if members.is_empty() || members.len() < params.min_count {
                continue;
            }

            let (min_x, max_x) = members
                .iter()
                .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), (_, p, _)| {
                    (lo.min(p.x), hi.max(p.x))
                });
            if max_x - min_x > params.x_tolerance {
                continue;
            }
            if !members.iter().all(|(_, _, speed)| *speed < params.still_threshold) {
                continue;
            }

            *fired = true;
            let Some(bounds) = Aabb::from_points(members.iter().map(|(_, p, _)| *p)) else {
                continue;
            };
            debug!(
                "Cluster rule {} fired with {} members",
                rule.index,
                members.len()
            );
            let ctx = ActionContext::cluster(
                bounds.center(),
                members.into_iter().map(|(id, _, _)| id).collect(),
            );
            Self::fire_rule(scene, rule, &ctx);
        }
    }

    fn run_updates(&self, scene: &mut Scene) {
        for rule in &self.rules.update {
            for id in scene.bodies.ids_with_group(rule.groups.primary()) {
                let Some(position) = scene.bodies.get(&id).map(|b| b.position) else {
                    continue;
                };
                rule.execute_actions(scene, &ActionContext::update(&id, position));
            }
        }
    }

    /// Run a rule's actions, then show its popup.
    fn fire_rule(scene: &mut Scene, rule: &CompiledRule, ctx: &ActionContext) {
        rule.execute_actions(scene, ctx);
        if let (Some(popup), Some(origin)) = (&rule.popup, ctx.origin()) {
            scene.effects.popup(&popup.text, origin + popup.offset);
        }
    }
}

impl StepHooks for InteractionDispatcher {
    fn on_collision_start(&mut self, scene: &mut Scene, event: &CollisionStart) {
        self.dispatch_collision(scene, event);
    }

    fn on_tick(&mut self, scene: &mut Scene) {
        self.evaluate_clusters(scene);
        self.run_updates(scene);
    }
}
