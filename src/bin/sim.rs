//! tidepool-sim binary
//!
//! Loads a room from disk and runs it headless, logging every outbound event.
//!
//! ## Configuration
//!
//! Service settings layer as defaults ← optional TOML file (`--config`) ←
//! `TIDEPOOL__*` environment variables (e.g. `TIDEPOOL__PHYSICS__MAX_SPEED`).
//!
//! | Flag / env                 | Default      | Description                     |
//! |----------------------------|--------------|---------------------------------|
//! | `TIDEPOOL_ROOM`            | `room_beach` | Room loaded at start            |
//! | `TIDEPOOL_ROOMS_DIR`       | `rooms`      | Directory holding room files    |
//! | `TIDEPOOL_ASSETS_DIR`      | `.`          | Root for texture paths          |
//! | `TIDEPOOL_TICK_RATE_HZ`    | `60`         | Simulation tick rate            |
//! | `TIDEPOOL_MAX_TICKS`       | *(none)*     | Stop after this many ticks      |
//! | `TIDEPOOL_CONFIG`          | *(none)*     | TOML config file                |
//! | `TIDEPOOL_SEED`            | *(config)*   | Overrides `physics.seed`        |

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use parking_lot::Mutex;
use tokio::sync::broadcast::error::RecvError;
use tidepool::{
    loader::FsRoomSource,
    runner::{RoomRunner, RunnerConfig},
    service::RoomService,
    types::RoomServiceConfig,
};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "tidepool-sim", about = "Headless Tidepool room simulator", version)]
struct Args {
    /// Room to load
    #[arg(long, env = "TIDEPOOL_ROOM", default_value = "room_beach")]
    room: String,

    /// Directory containing `<room>.json` and `<room>.interactions.json`
    #[arg(long, env = "TIDEPOOL_ROOMS_DIR", default_value = "rooms")]
    rooms_dir: PathBuf,

    /// Texture paths are resolved against this directory
    #[arg(long, env = "TIDEPOOL_ASSETS_DIR", default_value = ".")]
    assets_dir: PathBuf,

    /// Tick rate (Hz)
    #[arg(long, env = "TIDEPOOL_TICK_RATE_HZ", default_value_t = 60.0)]
    tick_rate_hz: f32,

    /// Stop after this many ticks
    #[arg(long, env = "TIDEPOOL_MAX_TICKS")]
    max_ticks: Option<u64>,

    /// Optional TOML config file
    #[arg(long, env = "TIDEPOOL_CONFIG")]
    config: Option<PathBuf>,

    /// Wiggle seed
    #[arg(long, env = "TIDEPOOL_SEED")]
    seed: Option<u64>,
}

fn load_config(path: Option<&Path>) -> Result<RoomServiceConfig> {
    let mut builder = config::Config::builder().add_source(
        config::Config::try_from(&RoomServiceConfig::default())
            .context("Failed to serialise default config")?,
    );
    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path).required(true));
    }
    builder
        .add_source(
            config::Environment::with_prefix("TIDEPOOL")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to read configuration")?
        .try_deserialize()
        .context("Invalid configuration")
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tidepool=debug".parse()?),
        )
        .init();

    let args = Args::parse();

    let mut service_config = load_config(args.config.as_deref())?;
    if let Some(seed) = args.seed {
        service_config.physics.seed = seed;
    }

    log::info!(
        "Starting tidepool-sim (room='{}', rooms_dir='{}', {:.0}Hz)",
        args.room,
        args.rooms_dir.display(),
        args.tick_rate_hz,
    );

    let service = Arc::new(Mutex::new(RoomService::new(service_config)));
    let source = Arc::new(FsRoomSource::new(&args.rooms_dir));
    let runner_config = RunnerConfig {
        tick_rate_hz: args.tick_rate_hz,
        max_ticks: args.max_ticks,
        asset_root: args.assets_dir,
        initial_room: Some(args.room),
    };

    // The command sender is unused headless; keep it alive so the channel
    // stays open.
    let (runner, _commands) = RoomRunner::new(runner_config, source, service.clone());

    let mut events = runner.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => tracing::debug!(
                    subject = event.subject,
                    payload = %String::from_utf8_lossy(&event.payload),
                    "event"
                ),
                Err(RecvError::Lagged(n)) => log::warn!("Event log skipped {} events", n),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let ticks = runner.run().await?;
    let stats = service.lock().stats();
    log::info!(
        "Stopped after {} ticks: {}",
        ticks,
        serde_json::to_string(&stats)?
    );
    Ok(())
}
