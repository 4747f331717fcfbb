//! Error types for the session layer.

use zombeans_protocol::ConnectionId;
use zombeans_room::RoomError;

/// Errors that can occur while routing a connection's requests.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// No record exists for this connection. It never connected, or it
    /// already disconnected.
    #[error("unknown connection {0}")]
    UnknownConnection(ConnectionId),

    /// `connect` was called twice for the same connection.
    #[error("connection {0} is already registered")]
    AlreadyConnected(ConnectionId),

    /// The room layer refused the request.
    #[error(transparent)]
    Room(#[from] RoomError),
}

impl SessionError {
    /// Whether this is a request the connection's role may not make.
    /// Those are dropped with a warning and never answered.
    pub fn is_invalid_role(&self) -> bool {
        matches!(self, Self::Room(RoomError::InvalidRole(_)))
    }
}
