//! Unified error type for the zombeans server.

use zombeans_protocol::ProtocolError;
use zombeans_room::RoomError;
use zombeans_session::SessionError;
use zombeans_sim::SimError;
use zombeans_transport::TransportError;

/// Top-level error that wraps every crate-specific error.
///
/// The `#[from]` on each variant lets `?` convert sub-crate errors.
#[derive(Debug, thiserror::Error)]
pub enum ZombeansError {
    /// Binding, accepting, sending, or receiving failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A frame could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The directory refused a connection or request.
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Room(#[from] RoomError),

    #[error(transparent)]
    Sim(#[from] SimError),

    /// The config file could not be parsed.
    #[error("invalid config: {0}")]
    Config(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
