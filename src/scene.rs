//! Mutable state shared by the physics hooks: the registry, the room clock
//! and the effects produced while a tick is dispatched.

use std::collections::HashSet;

use crate::physics::CollisionStart;
use crate::protocol::{BodyRemoved, BodySpawned, PopupShown, RuleEventFired};
use crate::registry::BodyRegistry;
use crate::types::{FrameConfig, Vec2};

/// Room-local simulation clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimClock {
    pub tick: u64,
    /// Milliseconds simulated since the room loaded.
    pub elapsed_ms: f64,
    /// Whole-millisecond stamp; strictly increases every tick.
    pub timestamp_ms: u64,
}

impl SimClock {
    pub fn advance(&mut self, delta_ms: f32) {
        self.tick += 1;
        self.elapsed_ms += f64::from(delta_ms);
        self.timestamp_ms = (self.elapsed_ms as u64).max(self.timestamp_ms + 1);
    }
}

/// Side effects recorded while hooks run; drained once per tick.
#[derive(Debug, Default)]
pub struct EffectLog {
    pub popups: Vec<PopupShown>,
    pub rule_events: Vec<RuleEventFired>,
    pub spawned: Vec<BodySpawned>,
    pub removed: Vec<BodyRemoved>,
}

impl EffectLog {
    pub fn popup(&mut self, text: &str, at: Vec2) {
        self.popups.push(PopupShown {
            text: text.to_string(),
            x: at.x,
            y: at.y,
        });
    }

    pub fn take(&mut self) -> EffectLog {
        std::mem::take(self)
    }
}

pub struct Scene {
    pub bodies: BodyRegistry,
    pub clock: SimClock,
    pub effects: EffectLog,
    pub frame: FrameConfig,
    /// Groups whose bodies get a `spawnTime` stamp.
    pub timed_groups: HashSet<String>,
    /// Per-room counter behind the `{seq}` placeholder.
    pub spawn_seq: u64,
}

impl Scene {
    pub fn new(bodies: BodyRegistry, frame: FrameConfig) -> Self {
        Self {
            bodies,
            clock: SimClock::default(),
            effects: EffectLog::default(),
            frame,
            timed_groups: HashSet::new(),
            spawn_seq: 0,
        }
    }

    /// Unregister `id` and record the removal.
    pub fn remove_body(&mut self, id: &str) -> bool {
        if self.bodies.unregister(id).is_some() {
            self.effects.removed.push(BodyRemoved {
                body_id: id.to_string(),
            });
            true
        } else {
            false
        }
    }

    /// Reset everything room-scoped.
    pub fn reset(&mut self) {
        self.bodies.clear();
        self.clock = SimClock::default();
        self.effects = EffectLog::default();
        self.timed_groups.clear();
        self.spawn_seq = 0;
    }
}

/// Typed physics hooks.
///
/// The room service attaches one implementation when a room loads and
/// detaches it when the room is cleared; a second attach is refused.
pub trait StepHooks {
    /// Called once per collision-start event, in report order.
    fn on_collision_start(&mut self, scene: &mut Scene, event: &CollisionStart);

    /// Called once per tick after every collision has been dispatched.
    fn on_tick(&mut self, scene: &mut Scene);
}
