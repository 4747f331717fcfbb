//! Error types for the room layer.

use zombeans_protocol::RoomCode;
use zombeans_sim::SimError;

/// Errors that can occur during room operations.
///
/// The `Display` text doubles as the `reason` of failure responses, so
/// it is written for the person at the other end of the connection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// No live room has this code.
    #[error("room {0} not found")]
    NotFound(RoomCode),

    /// The room exists but isn't taking joins.
    #[error("room {code} is not open: {reason}")]
    NotOpen { code: RoomCode, reason: String },

    /// The roster is at `max_players`.
    #[error("room {0} is full")]
    Full(RoomCode),

    /// `start_game` with fewer than `min_players` in the roster.
    #[error("need at least {need} players to start, have {have}")]
    InsufficientPlayers { have: usize, need: usize },

    /// The request isn't allowed for this connection's role.
    #[error("not allowed: {0}")]
    InvalidRole(String),

    /// The request referred to something that doesn't exist or can't
    /// happen in the current state.
    #[error("precondition violated: {0}")]
    Precondition(String),
}

impl From<SimError> for RoomError {
    fn from(err: SimError) -> Self {
        match err {
            SimError::NotController(_) => Self::InvalidRole(err.to_string()),
            SimError::UnknownSlot(_) | SimError::DuplicateSlot(_) => {
                Self::Precondition(err.to_string())
            }
        }
    }
}
