//! Tokio driver for a [`RoomService`].
//!
//! ## Event contract (inbound)
//!
//! | Command                     | Effect                                   |
//! |-----------------------------|------------------------------------------|
//! | `SwitchRoom(room)`          | fetch, validate and load `room`          |
//! | `PointerMove { x, y }`      | hover at client coordinates              |
//! | `PointerDown { x, y }`      | try to grab the body under the pointer   |
//! | `PointerUp`                 | release the drag                         |
//! | `Snapshot(reply)`           | reply with the current `RoomSnapshot`    |
//! | `Stats(reply)`              | reply with `RoomStats`                   |
//!
//! ## Event contract (outbound)
//!
//! | Subject                  | Payload type                      |
//! |--------------------------|-----------------------------------|
//! | `room.loaded`            | `RoomEvent<String>` (digest)      |
//! | `room.popup`             | `RoomEvent<PopupShown>`           |
//! | `room.rule.event`        | `RoomEvent<RuleEventFired>`       |
//! | `room.body.spawned`      | `RoomEvent<BodySpawned>`          |
//! | `room.body.removed`      | `RoomEvent<BodyRemoved>`          |
//! | `room.tether.detached`   | `RoomEvent<String>` (body id)     |

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use bytes::Bytes;
use log::{info, warn};
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::Instrument;

use crate::loader::RoomSource;
use crate::physics::Viewport;
use crate::protocol::{subjects, RoomEvent, RoomSnapshot};
use crate::registry::AssetTicket;
use crate::service::{RoomService, TickEvents};
use crate::types::RoomStats;

type AssetInbox = Arc<Mutex<Vec<(AssetTicket, std::result::Result<Bytes, String>)>>>;

// ---------------------------------------------------------------------------
// Config & messages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Tick rate in Hz.
    pub tick_rate_hz: f32,
    /// Stop after this many ticks (`None` runs until Ctrl-C).
    pub max_ticks: Option<u64>,
    /// Texture paths are resolved against this directory.
    pub asset_root: PathBuf,
    /// Room loaded before the first tick.
    pub initial_room: Option<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 60.0,
            max_ticks: None,
            asset_root: PathBuf::from("."),
            initial_room: None,
        }
    }
}

#[derive(Debug)]
pub enum RunnerCommand {
    SwitchRoom(String),
    PointerMove { x: f32, y: f32 },
    PointerDown { x: f32, y: f32 },
    PointerUp,
    Snapshot(oneshot::Sender<RoomSnapshot>),
    Stats(oneshot::Sender<RoomStats>),
}

/// A serialised outbound event.
#[derive(Debug, Clone)]
pub struct OutboundEvent {
    pub subject: &'static str,
    pub payload: Bytes,
}

// ---------------------------------------------------------------------------
// RoomRunner
// ---------------------------------------------------------------------------

/// Owns the service behind a mutex and ticks it on a fixed interval.
pub struct RoomRunner<S> {
    config: RunnerConfig,
    source: Arc<S>,
    service: Arc<Mutex<RoomService>>,
    viewport: Viewport,
    commands: Option<mpsc::Receiver<RunnerCommand>>,
    events: broadcast::Sender<OutboundEvent>,
    inbox: AssetInbox,
}

impl<S: RoomSource + 'static> RoomRunner<S> {
    pub fn new(
        config: RunnerConfig,
        source: Arc<S>,
        service: Arc<Mutex<RoomService>>,
    ) -> (Self, mpsc::Sender<RunnerCommand>) {
        let (tx, rx) = mpsc::channel(64);
        let (events, _) = broadcast::channel(256);
        let viewport = {
            let svc = service.lock();
            let frame = &svc.config().frame;
            Viewport::identity(frame.width, frame.height)
        };
        let runner = Self {
            config,
            source,
            service,
            viewport,
            commands: Some(rx),
            events,
            inbox: Arc::new(Mutex::new(Vec::new())),
        };
        (runner, tx)
    }

    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OutboundEvent> {
        self.events.subscribe()
    }

    pub fn service(&self) -> &Arc<Mutex<RoomService>> {
        &self.service
    }

    /// Fetch and load `room`. The fetch runs without holding the lock; on
    /// any failure the current room stays loaded.
    pub async fn switch_room(&self, room: &str) -> Result<()> {
        let span = tracing::info_span!("load_room", room = %room);
        async {
            let data = self
                .source
                .fetch(room)
                .await
                .with_context(|| format!("Failed to fetch room '{}'", room))?;
            {
                let mut svc = self.service.lock();
                svc.load_room(&data)
                    .with_context(|| format!("Room '{}' rejected", room))?;
            }
            tracing::info!(digest = %data.digest, "room ready");
            self.publish(room, 0, subjects::ROOM_LOADED, &data.digest);
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// Run until Ctrl-C or `max_ticks`. Returns the number of ticks run.
    pub async fn run(mut self) -> Result<u64> {
        let mut commands = self
            .commands
            .take()
            .context("RoomRunner::run called twice")?;

        if let Some(room) = self.config.initial_room.clone() {
            if let Err(e) = self.switch_room(&room).await {
                warn!("Initial room failed to load: {:#}", e);
            }
        }

        let hz = self.config.tick_rate_hz.max(1.0);
        let delta_ms = 1000.0 / hz;
        let mut timer = tokio::time::interval(Duration::from_secs_f32(1.0 / hz));
        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        info!("RoomRunner ticking at {:.0}Hz", hz);
        let mut ticks = 0u64;
        loop {
            tokio::select! {
                _ = timer.tick() => {
                    self.step(delta_ms);
                    ticks += 1;
                    if self.config.max_ticks.is_some_and(|max| ticks >= max) {
                        info!("Reached {} ticks, stopping", ticks);
                        break;
                    }
                }
                Some(cmd) = commands.recv() => {
                    self.handle(cmd).await;
                }
                _ = &mut shutdown => {
                    info!("RoomRunner shutting down (SIGINT)");
                    break;
                }
            }
        }
        Ok(ticks)
    }

    /// One locked tick: deliver finished assets, advance, collect requests.
    fn step(&self, delta_ms: f32) {
        let finished: Vec<_> = std::mem::take(&mut *self.inbox.lock());
        let (room, events, tickets) = {
            let mut svc = self.service.lock();
            for (ticket, result) in finished {
                svc.resolve_asset(&ticket, result);
            }
            let events = svc.tick(delta_ms);
            let room = svc.room().unwrap_or_default().to_string();
            (room, events, svc.take_asset_requests())
        };

        self.spawn_asset_loads(tickets);
        self.publish_tick(&room, &events);
    }

    async fn handle(&self, cmd: RunnerCommand) {
        match cmd {
            RunnerCommand::SwitchRoom(room) => {
                if let Err(e) = self.switch_room(&room).await {
                    warn!("Keeping current room: {:#}", e);
                }
            }
            RunnerCommand::PointerMove { x, y } => {
                self.service.lock().pointer_move(&self.viewport, x, y);
            }
            RunnerCommand::PointerDown { x, y } => {
                if let Some(id) = self.service.lock().pointer_down(&self.viewport, x, y) {
                    log::debug!("Grabbed '{}'", id);
                }
            }
            RunnerCommand::PointerUp => self.service.lock().pointer_up(),
            RunnerCommand::Snapshot(reply) => {
                let snapshot = self.service.lock().snapshot();
                let _ = reply.send(snapshot);
            }
            RunnerCommand::Stats(reply) => {
                let stats = self.service.lock().stats();
                let _ = reply.send(stats);
            }
        }
    }

    fn spawn_asset_loads(&self, tickets: Vec<AssetTicket>) {
        for ticket in tickets {
            let path = self
                .config
                .asset_root
                .join(ticket.path.trim_start_matches('/'));
            let inbox = self.inbox.clone();
            tokio::spawn(async move {
                let result = tokio::fs::read(&path)
                    .await
                    .map(Bytes::from)
                    .map_err(|e| format!("{}: {}", path.display(), e));
                inbox.lock().push((ticket, result));
            });
        }
    }

    fn publish_tick(&self, room: &str, events: &TickEvents) {
        let frame = events.tick;
        for popup in &events.popups {
            self.publish(room, frame, subjects::POPUP_SHOWN, popup);
        }
        for event in &events.rule_events {
            self.publish(room, frame, subjects::RULE_EVENT, event);
        }
        for spawned in &events.spawned {
            self.publish(room, frame, subjects::BODY_SPAWNED, spawned);
        }
        for removed in &events.removed {
            self.publish(room, frame, subjects::BODY_REMOVED, removed);
        }
        for id in &events.detached_tethers {
            self.publish(room, frame, subjects::TETHER_DETACHED, id);
        }
    }

    /// Serialise and broadcast. Errors are logged and swallowed.
    fn publish<T: serde::Serialize>(
        &self,
        room: &str,
        frame: u64,
        subject: &'static str,
        payload: T,
    ) {
        match serde_json::to_vec(&RoomEvent::new(room, frame, payload)) {
            Ok(bytes) => {
                // No subscribers is fine.
                let _ = self.events.send(OutboundEvent {
                    subject,
                    payload: Bytes::from(bytes),
                });
            }
            Err(e) => warn!("Failed to serialise event for {}: {}", subject, e),
        }
    }
}
