//! Shared data model and wire contract for zombeans.
//!
//! - **Types** ([`Slot`], [`RoomCode`], [`Vec2`], [`Role`], ...) — the
//!   vocabulary every other crate speaks.
//! - **Messages** ([`PlayerRequest`], [`ViewerEvent`], [`Outbound`], ...)
//!   — what owners, players, and viewers exchange with the server.
//! - **Codec** ([`Codec`], [`JsonCodec`]) — how messages become bytes.
//!
//! ```text
//! Transport (bytes) → Protocol (role-scoped messages) → Session directory
//! ```

mod codec;
mod error;
mod messages;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use messages::{
    AbilityState, EntityState, Inbound, JoinResponse, Outbound, OwnerEvent, OwnerRequest,
    PlayerEvent, PlayerRequest, RosterEntry, Status, ViewResponse, ViewerEvent, ViewerRequest,
};
pub use types::{
    AbilityCode, ArenaDescription, Direction, GameOverReason, Outcome, Role, RoomCode, Slot,
    Vec2,
};
pub use zombeans_transport::ConnectionId;
