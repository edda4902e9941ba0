//! RoomService – room lifecycle, the per-tick pipeline and renderer output.

use log::{debug, info};

use crate::dispatch::InteractionDispatcher;
use crate::effects::PopupBoard;
use crate::error::{ConfigError, Error, Result};
use crate::layout;
use crate::loader::RoomData;
use crate::physics::{PhysicsWorld, Viewport};
use crate::protocol::{
    BodyRemoved, BodySpawned, BodyTransform, PopupShown, RoomSnapshot, RuleEventFired,
};
use crate::registry::{AssetTicket, BodyRegistry};
use crate::rules::RuleSet;
use crate::scene::{Scene, StepHooks};
use crate::types::{RoomServiceConfig, RoomStats};
use bytes::Bytes;

// ---------------------------------------------------------------------------
// Tick result
// ---------------------------------------------------------------------------

/// Events produced by a single [`RoomService::tick`] call.
#[derive(Debug, Default)]
pub struct TickEvents {
    /// The room tick that produced these events.
    pub tick: u64,
    /// Collision-start events handed to the rules.
    pub collisions: usize,
    pub popups: Vec<PopupShown>,
    pub rule_events: Vec<RuleEventFired>,
    pub spawned: Vec<BodySpawned>,
    pub removed: Vec<BodyRemoved>,
    /// Ids of bodies whose tether snapped.
    pub detached_tethers: Vec<String>,
}

pub struct RoomService {
    config: RoomServiceConfig,
    scene: Scene,
    hooks: Option<InteractionDispatcher>,
    popups: PopupBoard,
    room: Option<String>,
    digest: Option<String>,
    total_ticks: u64,
}

impl RoomService {
    pub fn new(config: RoomServiceConfig) -> Self {
        let physics = PhysicsWorld::new(config.physics.clone());
        let scene = Scene::new(BodyRegistry::new(physics), config.frame.clone());
        let popups = PopupBoard::new(config.popup_lifetime_ms, config.popup_rise_per_ms);
        Self {
            config,
            scene,
            hooks: None,
            popups,
            room: None,
            digest: None,
            total_ticks: 0,
        }
    }

    pub fn config(&self) -> &RoomServiceConfig {
        &self.config
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn room(&self) -> Option<&str> {
        self.room.as_deref()
    }

    pub fn dispatcher(&self) -> Option<&InteractionDispatcher> {
        self.hooks.as_ref()
    }

    // -----------------------------------------------------------------------
    // Hooks
    // -----------------------------------------------------------------------

    /// Install the interaction hooks. Only one set can be attached.
    pub fn attach_hooks(&mut self, hooks: InteractionDispatcher) -> Result<()> {
        if self.hooks.is_some() {
            return Err(Error::HooksAttached);
        }
        self.hooks = Some(hooks);
        Ok(())
    }

    pub fn detach_hooks(&mut self) -> Option<InteractionDispatcher> {
        self.hooks.take()
    }

    // -----------------------------------------------------------------------
    // Room lifecycle
    // -----------------------------------------------------------------------

    /// Replace the current room with `data`.
    ///
    /// Rules and bodies are validated first; on error the current room keeps
    /// running untouched.
    pub fn load_room(&mut self, data: &RoomData) -> Result<()> {
        let rules = RuleSet::compile(&data.rules)?;
        let bodies = layout::plan_layout(&data.bodies, &self.config.physics)?;
        let frame = layout::plan_frame(&self.config.frame);
        if let Some(clash) = frame
            .zones
            .iter()
            .find(|z| bodies.iter().any(|b| b.id == z.id))
        {
            return Err(ConfigError::DuplicateBodyId(clash.id.clone()).into());
        }

        self.clear_room();

        for wall in frame.walls {
            self.scene.bodies.physics_mut().insert(wall);
        }
        let count = bodies.len();
        for body in frame.zones.into_iter().chain(bodies) {
            let handle = self.scene.bodies.register(body.id, body.params, body.texture)?;
            if let Some(max_stretch) = body.tether {
                self.scene.bodies.physics_mut().add_tether(handle, max_stretch);
            }
        }

        self.scene.timed_groups = rules.timed_groups();
        info!(
            "Loaded room '{}': {} bodies, {} rules (digest {})",
            data.name,
            count,
            rules.len(),
            data.digest
        );
        self.room = Some(data.name.clone());
        self.digest = Some(data.digest.clone());
        self.attach_hooks(InteractionDispatcher::new(rules))
    }

    /// Tear the current room down. Safe to call with no room loaded.
    pub fn clear_room(&mut self) {
        if let Some(room) = self.room.take() {
            debug!("Clearing room '{}'", room);
        }
        self.detach_hooks();
        self.scene.reset();
        self.popups.clear();
        self.digest = None;
    }

    // -----------------------------------------------------------------------
    // Main tick
    // -----------------------------------------------------------------------

    /// Advance the room by `delta_ms` milliseconds.
    pub fn tick(&mut self, delta_ms: f32) -> TickEvents {
        self.total_ticks += 1;
        self.scene.clock.advance(delta_ms);

        let report = self.scene.bodies.physics_mut().advance(delta_ms);
        let detached_tethers = report
            .detached_tethers
            .iter()
            .filter_map(|h| self.scene.bodies.id_of(*h).map(str::to_string))
            .collect();

        if let Some(hooks) = self.hooks.as_mut() {
            for event in &report.collisions {
                hooks.on_collision_start(&mut self.scene, event);
            }
            hooks.on_tick(&mut self.scene);
        }

        let effects = self.scene.effects.take();
        self.popups.advance(delta_ms);
        for popup in &effects.popups {
            self.popups.show(popup);
        }

        TickEvents {
            tick: self.scene.clock.tick,
            collisions: report.collisions.len(),
            popups: effects.popups,
            rule_events: effects.rule_events,
            spawned: effects.spawned,
            removed: effects.removed,
            detached_tethers,
        }
    }

    // -----------------------------------------------------------------------
    // Pointer
    // -----------------------------------------------------------------------

    pub fn pointer_move(&mut self, viewport: &Viewport, client_x: f32, client_y: f32) {
        let p = viewport.to_world(client_x, client_y);
        self.scene.bodies.physics_mut().pointer_move(p);
    }

    /// Grab the body under the pointer; returns its id.
    pub fn pointer_down(
        &mut self,
        viewport: &Viewport,
        client_x: f32,
        client_y: f32,
    ) -> Option<String> {
        let p = viewport.to_world(client_x, client_y);
        let handle = self.scene.bodies.physics_mut().pointer_down(p)?;
        self.scene.bodies.id_of(handle).map(str::to_string)
    }

    pub fn pointer_up(&mut self) {
        self.scene.bodies.physics_mut().pointer_up();
    }

    // -----------------------------------------------------------------------
    // Assets
    // -----------------------------------------------------------------------

    pub fn take_asset_requests(&mut self) -> Vec<AssetTicket> {
        self.scene.bodies.take_asset_requests()
    }

    pub fn resolve_asset(
        &mut self,
        ticket: &AssetTicket,
        result: std::result::Result<Bytes, String>,
    ) -> bool {
        self.scene.bodies.resolve_asset(ticket, result)
    }

    // -----------------------------------------------------------------------
    // Output
    // -----------------------------------------------------------------------

    /// Full draw state for the renderer.
    pub fn snapshot(&self) -> RoomSnapshot {
        let registry = &self.scene.bodies;
        let bodies = registry
            .iter()
            .map(|(id, b)| BodyTransform {
                body_id: id.to_string(),
                x: b.position.x,
                y: b.position.y,
                angle: b.angle,
                vx: b.velocity.x,
                vy: b.velocity.y,
                texture: registry.texture(id).map(str::to_string),
                asset_ready: registry.asset(id).is_some(),
            })
            .collect();

        RoomSnapshot {
            room: self.room.clone(),
            frame: self.scene.clock.tick,
            bodies,
            popups: self.popups.views(),
        }
    }

    pub fn stats(&self) -> RoomStats {
        let physics = self.scene.bodies.physics();
        RoomStats {
            room: self.room.clone(),
            room_digest: self.digest.clone(),
            registered_bodies: self.scene.bodies.len(),
            tethers: physics.tethers().len(),
            attachments: physics.attachments().len(),
            collision_rules: self.hooks.as_ref().map_or(0, |h| h.rules().collision.len()),
            cluster_rules_fired: self.hooks.as_ref().map_or(0, |h| h.fired_count()),
            sandbox_started: physics.pointer().sandbox_started(),
            total_ticks: self.total_ticks,
        }
    }
}
