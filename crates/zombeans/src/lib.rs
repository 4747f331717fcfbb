//! # Zombeans
//!
//! Session server for a browser tag game. An owner opens a room and
//! shares its six-letter code, players join from their phones, viewers
//! watch the arena, and the server runs the simulation: one seeded
//! infected entity chases everyone else until all survivors are caught
//! or time runs out.
//!
//! Connections pick their role by path: `/owner` (or `/host`),
//! `/player`, `/viewer`. Every message is a JSON object tagged with
//! `"type"`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use zombeans::prelude::*;
//!
//! # async fn run() -> Result<(), ZombeansError> {
//! let server = ZombeansServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .room_config(RoomConfig { min_players: 2, ..RoomConfig::default() })
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::ServerConfig;
pub use error::ZombeansError;
pub use server::{ZombeansServer, ZombeansServerBuilder};

pub mod prelude {
    pub use crate::{ServerConfig, ZombeansError, ZombeansServer, ZombeansServerBuilder};
    pub use zombeans_protocol::{
        AbilityCode, Direction, GameOverReason, Outbound, Role, RoomCode, Slot,
    };
    pub use zombeans_room::{RoomConfig, RoomState};
    pub use zombeans_session::{Directory, MembershipState};
    pub use zombeans_sim::{Arena, SimConfig};
    pub use zombeans_tick::TickConfig;
}
