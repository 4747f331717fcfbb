//! Error types for the simulation engine.

use zombeans_protocol::Slot;

/// Errors from operations on a [`World`](crate::World).
///
/// All of them are precondition violations: the caller named an entity
/// that doesn't exist or asked for something its slot may not do. The
/// world is left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimError {
    #[error("no entity for slot {0}")]
    UnknownSlot(Slot),

    #[error("slot {0} already has an entity")]
    DuplicateSlot(Slot),

    #[error("slot {0} is not the controller")]
    NotController(Slot),
}
