//! Session directory for zombeans.
//!
//! Knows every live connection by its [`ConnectionId`] and role, owns
//! the table of rooms by code, and routes each inbound request to the
//! right room.
//!
//! # How it fits in the stack
//!
//! ```text
//! Connection handlers (above)  ← decode frames into `Inbound` requests
//!     ↕
//! Directory (this crate)       ← records, room codes, routing
//!     ↕
//! Rooms (below)                ← roster, lifecycle, simulation, tick driver
//! ```
//!
//! [`ConnectionId`]: zombeans_protocol::ConnectionId

mod code;
mod directory;
mod error;
mod record;

pub use directory::Directory;
pub use error::SessionError;
pub use record::{MembershipState, PlayerRecord, ViewerRecord};
