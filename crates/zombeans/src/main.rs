use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use zombeans::prelude::*;

/// Zombeans session server.
///
/// Settings come from the defaults, then the optional JSON config file,
/// then the flags below.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSON config file (see `ServerConfig`)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Address to bind to, e.g. 0.0.0.0:8080
    #[arg(short, long)]
    bind: Option<String>,
    /// Milliseconds between simulation ticks
    #[arg(short, long)]
    tick_ms: Option<u64>,
    /// Game length limit in ticks
    #[arg(long)]
    max_ticks: Option<u64>,
    #[arg(long)]
    min_players: Option<usize>,
    #[arg(long)]
    max_players: Option<usize>,
    #[arg(long)]
    arena_width: Option<f32>,
    #[arg(long)]
    arena_height: Option<f32>,
    #[arg(long)]
    entity_radius: Option<f32>,
    /// Velocity change per tick while a key is held
    #[arg(long)]
    acceleration: Option<f32>,
    /// Per-axis speed limit, units per second
    #[arg(long)]
    max_velocity: Option<f32>,
    /// Slot whose entity starts infected
    #[arg(long)]
    seed_slot: Option<u32>,
    /// Slot that gets the controller abilities
    #[arg(long, conflicts_with = "no_controller")]
    controller_slot: Option<u32>,
    /// Play without a controller
    #[arg(long)]
    no_controller: bool,
}

impl Args {
    fn into_config(self) -> Result<ServerConfig, ZombeansError> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::from_file(path)?,
            None => ServerConfig::default(),
        };
        let room = &mut config.room;

        if let Some(bind) = self.bind {
            config.bind = bind;
        }
        if let Some(ms) = self.tick_ms {
            room.tick.interval = Duration::from_millis(ms);
        }
        if let Some(max_ticks) = self.max_ticks {
            room.sim.max_ticks = max_ticks;
        }
        if let Some(min) = self.min_players {
            room.min_players = min;
        }
        if let Some(max) = self.max_players {
            room.max_players = max;
        }
        if let Some(width) = self.arena_width {
            room.arena.width = width;
        }
        if let Some(height) = self.arena_height {
            room.arena.height = height;
        }
        if let Some(radius) = self.entity_radius {
            room.sim.entity_radius = radius;
        }
        if let Some(acceleration) = self.acceleration {
            room.sim.acceleration = acceleration;
        }
        if let Some(max_velocity) = self.max_velocity {
            room.sim.max_velocity = max_velocity;
        }
        if let Some(seed) = self.seed_slot {
            room.seed_slot = Slot(seed);
        }
        if let Some(controller) = self.controller_slot {
            room.controller_slot = Some(Slot(controller));
        }
        if self.no_controller {
            room.controller_slot = None;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), ZombeansError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Args::parse().into_config()?;
    tracing::info!(
        bind = %config.bind,
        tick_ms = config.room.tick.interval.as_millis() as u64,
        min_players = config.room.min_players,
        max_players = config.room.max_players,
        max_ticks = config.room.sim.max_ticks,
        "starting"
    );

    let server = ZombeansServer::builder().config(config).build().await?;

    tokio::select! {
        result = server.run() => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received Ctrl+C, shutting down");
            Ok(())
        }
    }
}
