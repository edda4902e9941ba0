//! Raw rule descriptors → compiled rules.
//!
//! Compilation checks everything that can be checked without a running room:
//! group arity, which actions a trigger may use, spawn shapes and id/texture
//! templates. A rule that compiles can still fail softly at evaluation time
//! (a body vanished, an id is taken), but never because of its own shape.

use std::collections::HashSet;

use log::warn;

use crate::error::ConfigError;
use crate::layout;
use crate::physics::Shape;
use crate::protocol::{
    ActionDescriptor, BodyMetadata, BodyOptions, ConditionDescriptor, ExitPathDescriptor, Metric,
    PopupDescriptor, RuleDescriptor, SeekDescriptor, SpawnAt, TriggerKind,
};
use crate::rules::actions::{self, ActionContext};
use crate::rules::steering;
use crate::rules::template::Template;
use crate::scene::Scene;
use crate::types::Vec2;

// ---------------------------------------------------------------------------
// Group matching
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupMatcher {
    /// Both bodies belong to the group.
    Single(String),
    /// One body in each group, either order.
    Pair(String, String),
    /// Each body's group is a member of the set.
    AnyOf(Vec<String>),
}

impl GroupMatcher {
    pub fn from_groups(groups: &[String]) -> Option<GroupMatcher> {
        match groups {
            [] => None,
            [g] => Some(GroupMatcher::Single(g.clone())),
            [g1, g2] => Some(GroupMatcher::Pair(g1.clone(), g2.clone())),
            many => Some(GroupMatcher::AnyOf(many.to_vec())),
        }
    }

    /// Does the (unordered) pair of groups satisfy the matcher?
    ///
    /// Bodies without a group never match.
    pub fn matches(&self, a: Option<&str>, b: Option<&str>) -> bool {
        let (Some(a), Some(b)) = (a, b) else {
            return false;
        };
        match self {
            GroupMatcher::Single(g) => a == g && b == g,
            GroupMatcher::Pair(g1, g2) => (a == g1 && b == g2) || (a == g2 && b == g1),
            GroupMatcher::AnyOf(set) => {
                set.iter().any(|g| g == a) && set.iter().any(|g| g == b)
            }
        }
    }

    /// Group of the acting body: the first group listed.
    ///
    /// Cluster and update rules select their members by this group alone;
    /// compilation rejects them when they list more than one.
    pub fn primary(&self) -> &str {
        match self {
            GroupMatcher::Single(g) | GroupMatcher::Pair(g, _) => g,
            GroupMatcher::AnyOf(set) => set.first().map(String::as_str).unwrap_or_default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Conditions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Condition(pub ConditionDescriptor);

impl Condition {
    /// Evaluate the metric for the actor and the other body's velocities.
    pub fn metric(&self, actor_velocity: Vec2, other_velocity: Vec2) -> f32 {
        match self.0.metric {
            Metric::ImpactSpeed => (actor_velocity - other_velocity).length(),
            Metric::VelocityY => actor_velocity.y,
        }
    }

    pub fn met(&self, actor_velocity: Vec2, other_velocity: Vec2) -> bool {
        self.0
            .operator
            .compare(self.metric(actor_velocity, other_velocity), self.0.value)
    }
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SpawnPlan {
    pub id: Template,
    pub texture: Option<Template>,
    pub shape: Shape,
    pub options: BodyOptions,
    pub metadata: BodyMetadata,
    pub at: SpawnAt,
}

#[derive(Debug, Clone)]
pub enum Action {
    RemoveSelf,
    RemoveOther,
    Spawn(Box<SpawnPlan>),
    Cling { stiffness: Option<f32> },
    RemoveGroup,
    Seek(SeekDescriptor),
    ExitPath(ExitPathDescriptor),
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::RemoveSelf => "removeSelf",
            Action::RemoveOther => "removeOther",
            Action::Spawn(_) => "spawn",
            Action::Cling { .. } => "cling",
            Action::RemoveGroup => "removeGroup",
            Action::Seek(_) => "seek",
            Action::ExitPath(_) => "exitPath",
        }
    }
}

fn allowed(trigger: TriggerKind, action: &ActionDescriptor) -> bool {
    use ActionDescriptor as A;
    match trigger {
        TriggerKind::Collision => matches!(
            action,
            A::RemoveSelf | A::RemoveOther | A::Spawn(_) | A::Cling(_)
        ),
        TriggerKind::Cluster => matches!(action, A::RemoveGroup | A::Spawn(_)),
        TriggerKind::Update => matches!(action, A::Seek(_) | A::ExitPath(_)),
    }
}

fn compile_action(
    index: usize,
    trigger: TriggerKind,
    raw: &ActionDescriptor,
) -> Result<Action, ConfigError> {
    if !allowed(trigger, raw) {
        return Err(ConfigError::ActionNotAllowed {
            index,
            action: raw.name(),
            trigger: trigger.as_str(),
        });
    }

    Ok(match raw {
        ActionDescriptor::RemoveSelf => Action::RemoveSelf,
        ActionDescriptor::RemoveOther => Action::RemoveOther,
        ActionDescriptor::RemoveGroup => Action::RemoveGroup,
        ActionDescriptor::Cling(c) => Action::Cling {
            stiffness: c.stiffness,
        },
        ActionDescriptor::Seek(s) => {
            if s.speed.is_nan() || s.speed < 0.0 {
                return Err(ConfigError::MalformedRule {
                    index,
                    reason: format!("seek speed must be non-negative, got {}", s.speed),
                });
            }
            Action::Seek(s.clone())
        }
        ActionDescriptor::ExitPath(e) => Action::ExitPath(e.clone()),
        ActionDescriptor::Spawn(s) => {
            let shape = layout::shape_from(&s.new_id, &s.shape, s.radius, s.width, s.height)?;
            Action::Spawn(Box::new(SpawnPlan {
                id: Template::parse(&s.new_id)?,
                texture: s.texture.as_deref().map(Template::parse).transpose()?,
                shape,
                options: s.options.clone(),
                metadata: s.metadata.clone(),
                at: s.at,
            }))
        }
    })
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Cluster thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterParams {
    pub min_count: usize,
    pub x_tolerance: f32,
    pub still_threshold: f32,
}

#[derive(Debug, Clone)]
pub struct CompiledRule {
    /// Position in the room's rule file.
    pub index: usize,
    pub raw: RuleDescriptor,
    pub trigger: TriggerKind,
    pub groups: GroupMatcher,
    pub condition: Option<Condition>,
    pub actions: Vec<Action>,
    pub popup: Option<PopupDescriptor>,
    pub emit_event: Option<String>,
    pub cluster: Option<ClusterParams>,
}

impl CompiledRule {
    pub fn compile(index: usize, raw: &RuleDescriptor) -> Result<CompiledRule, ConfigError> {
        let malformed = |reason: &str| ConfigError::MalformedRule {
            index,
            reason: reason.to_string(),
        };

        match (raw.trigger, raw.groups.len()) {
            (_, 0) => return Err(malformed("rule needs at least one group")),
            (TriggerKind::Collision, n) if n > 2 => {
                return Err(malformed("collision rules take one or two groups"))
            }
            (TriggerKind::Cluster | TriggerKind::Update, n) if n > 1 => {
                return Err(malformed("cluster and update rules take exactly one group"))
            }
            _ => {}
        }
        let groups = GroupMatcher::from_groups(&raw.groups)
            .ok_or_else(|| malformed("rule needs at least one group"))?;

        let cluster = match raw.trigger {
            TriggerKind::Cluster => {
                let (Some(min_count), Some(x_tolerance), Some(still_threshold)) =
                    (raw.min_count, raw.x_tolerance, raw.still_threshold)
                else {
                    return Err(malformed(
                        "cluster rules need minCount, xTolerance and stillThreshold",
                    ));
                };
                Some(ClusterParams {
                    min_count,
                    x_tolerance,
                    still_threshold,
                })
            }
            _ => None,
        };

        let actions = raw
            .actions
            .iter()
            .map(|a| compile_action(index, raw.trigger, a))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CompiledRule {
            index,
            raw: raw.clone(),
            trigger: raw.trigger,
            groups,
            condition: raw.condition.map(Condition),
            actions,
            popup: raw.popup.clone(),
            emit_event: raw.emit_event.clone(),
            cluster,
        })
    }

    /// Group test for a collision pair.
    pub fn matches(&self, a: Option<&str>, b: Option<&str>) -> bool {
        self.groups.matches(a, b)
    }

    /// `true` when a body of `group` plays the acting role for this rule.
    pub fn is_actor(&self, group: Option<&str>) -> bool {
        group == Some(self.groups.primary())
    }

    /// Absent conditions always pass. Velocities are the ones the pair
    /// carried into the collision.
    pub fn condition_met(&self, actor_velocity: Vec2, other_velocity: Vec2) -> bool {
        self.condition
            .map_or(true, |c| c.met(actor_velocity, other_velocity))
    }

    /// Run every action in declaration order. Failures are logged and the
    /// remaining actions still run.
    pub fn execute_actions(&self, scene: &mut Scene, ctx: &ActionContext) {
        for action in &self.actions {
            let result = match action {
                Action::Seek(seek) => steering::seek(scene, ctx, seek),
                Action::ExitPath(exit) => steering::exit_path(scene, ctx, exit),
                other => actions::apply(scene, ctx, other),
            };
            if let Err(e) = result {
                warn!("Rule {} action '{}' failed: {}", self.index, action.name(), e);
            }
        }
    }
}

/// Every rule of a room, split by trigger, in file order.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    pub collision: Vec<CompiledRule>,
    pub cluster: Vec<CompiledRule>,
    pub update: Vec<CompiledRule>,
}

impl RuleSet {
    pub fn compile(raw: &[RuleDescriptor]) -> Result<RuleSet, ConfigError> {
        let mut set = RuleSet::default();
        for (index, rule) in raw.iter().enumerate() {
            let compiled = CompiledRule::compile(index, rule)?;
            match compiled.trigger {
                TriggerKind::Collision => set.collision.push(compiled),
                TriggerKind::Cluster => set.cluster.push(compiled),
                TriggerKind::Update => set.update.push(compiled),
            }
        }
        Ok(set)
    }

    pub fn len(&self) -> usize {
        self.collision.len() + self.cluster.len() + self.update.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Groups steered by an exit path; their spawns get a `spawnTime`.
    pub fn timed_groups(&self) -> HashSet<String> {
        self.update
            .iter()
            .filter(|r| r.actions.iter().any(|a| matches!(a, Action::ExitPath(_))))
            .map(|r| r.groups.primary().to_string())
            .collect()
    }
}
