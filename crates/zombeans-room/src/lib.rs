//! Room lifecycle for zombeans.
//!
//! A room is created for an owner, collects players in `Lobby`, runs a
//! simulation while `Running`, and ends up `Finished`. Each running room
//! has its own tick driver task.
//!
//! # Key types
//!
//! - [`Room`] — roster, lifecycle, simulation, and fan-out for one room
//! - [`SharedRoom`] — a room behind its per-room lock
//! - [`RoomState`] — lifecycle state machine
//! - [`RoomConfig`] — player limits, roles, arena, tick, and sim settings

mod config;
mod error;
mod room;
mod ticker;

pub use config::{RoomConfig, RoomState};
pub use error::RoomError;
pub use room::{Departed, Mailbox, Room, SharedRoom, TickProgress};
