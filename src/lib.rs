//! Tidepool
//!
//! Rule-driven 2D physics rooms for a point-and-click mini-game. A room is a
//! layout of bodies plus a list of data-driven interaction rules; the engine
//! simulates the bodies and runs the rules against collisions, clusters of
//! resting bodies and per-tick steering.
//!
//! ## Architecture
//!
//! ```text
//! RoomRunner  (runner.rs)          ← tokio tick loop, commands, asset loads
//!   └── RoomService  (service.rs)  ← room lifecycle, tick pipeline, snapshots
//!         ├── InteractionDispatcher  (dispatch.rs) ← StepHooks impl
//!         │     └── RuleSet  (rules/)              ← compiled rules + actions
//!         └── Scene  (scene.rs)
//!               └── BodyRegistry  (registry.rs)   ← ids, assets
//!                     └── PhysicsWorld  (physics/) ← bodies, tethers, clings
//! ```
//!
//! Rooms come from a [`loader::RoomSource`]; [`hub::Hub`] maps clicks on the
//! hub screen to room transitions.

// Always available: data model, simulation and rules.
pub mod dispatch;
pub mod effects;
pub mod error;
pub mod hub;
pub mod layout;
pub mod loader;
pub mod physics;
pub mod protocol;
pub mod registry;
pub mod rules;
pub mod scene;
pub mod service;
pub mod types;

// The tokio driver requires the `runtime` feature.
#[cfg(feature = "runtime")]
pub mod runner;

// Convenience re-exports
pub use dispatch::InteractionDispatcher;
pub use error::{ConfigError, Error, LoadError, Result};
pub use hub::{Hub, Transition};
pub use loader::{MemoryRoomSource, RoomData, RoomSource};
pub use physics::{PhysicsConfig, PhysicsWorld, Viewport};
pub use registry::BodyRegistry;
pub use rules::RuleSet;
pub use scene::{Scene, StepHooks};
pub use service::{RoomService, TickEvents};
pub use types::{FrameConfig, RoomServiceConfig, RoomStats, Vec2};

#[cfg(feature = "runtime")]
pub use loader::FsRoomSource;
#[cfg(feature = "runtime")]
pub use runner::{RoomRunner, RunnerCommand, RunnerConfig};
