//! Tag-game simulation engine for zombeans.
//!
//! A [`World`] holds one circular [`Entity`] per player inside an
//! [`Arena`]. Each call to [`World::advance`] runs a fixed step:
//!
//! 1. velocity from held direction keys (per axis, clamped),
//! 2. position by velocity × dt, clamped to the arena walls,
//! 3. infection between touching entities (unless Immune is active),
//! 4. controller ability timers,
//! 5. the win check.
//!
//! The engine is synchronous and owns no clock; the room's tick task
//! drives it.

mod ability;
mod arena;
mod config;
mod entity;
mod error;
mod world;

pub use ability::AbilitySet;
pub use arena::Arena;
pub use config::{AbilityTiming, SimConfig};
pub use entity::Entity;
pub use error::SimError;
pub use world::{Snapshot, World};
