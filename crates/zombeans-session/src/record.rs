//! Per-connection records kept by the directory.

use zombeans_protocol::{RoomCode, Role, Slot};
use zombeans_room::Mailbox;

/// Where a player stands relative to a room.
///
/// ```text
/// Unbound ──(join)──→ Lobby ──(start)──→ InGame
///    ↑                  │                  │
///    └──────(owner leaves, room removed)───┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipState {
    Unbound,
    Lobby,
    InGame,
}

/// A connected player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRecord {
    pub display_name: Option<String>,
    pub slot: Option<Slot>,
    pub state: MembershipState,
    /// Lookup key of the room the player is bound to.
    pub room: Option<RoomCode>,
}

impl PlayerRecord {
    pub fn unbound() -> Self {
        Self {
            display_name: None,
            slot: None,
            state: MembershipState::Unbound,
            room: None,
        }
    }

    pub(crate) fn unbind(&mut self) {
        self.slot = None;
        self.state = MembershipState::Unbound;
        self.room = None;
    }
}

/// A connected viewer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewerRecord {
    pub room: Option<RoomCode>,
}

/// What the directory knows about one connection, by role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Record {
    Owner { room: RoomCode },
    Player(PlayerRecord),
    Viewer(ViewerRecord),
}

impl Record {
    pub(crate) fn role(&self) -> Role {
        match self {
            Self::Owner { .. } => Role::Owner,
            Self::Player(_) => Role::Player,
            Self::Viewer(_) => Role::Viewer,
        }
    }
}

/// A registered connection: its record plus its outbound mailbox.
#[derive(Debug)]
pub(crate) struct Entry {
    pub(crate) record: Record,
    pub(crate) mailbox: Mailbox,
}
