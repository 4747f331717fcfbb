//! The application-level message contract, scoped by connection role.
//!
//! Every message is a JSON object tagged with a snake_case `"type"`:
//!
//! ```text
//! player → server   {"type":"join_request","room_code":"QWERTY","display_name":"ana"}
//! server → player   {"type":"join_response","status":"success","slot":2,"is_controller":false}
//! server → viewer   {"type":"tick","tick":17,"per_slot":{"0":{"position":{..},"infected":true}}}
//! ```
//!
//! Requests are split per role so that a connection can only ever
//! decode the requests its role is allowed to make.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    AbilityCode, ArenaDescription, Direction, GameOverReason, RoomCode, Slot, Vec2,
};

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// Requests an owner connection may send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OwnerRequest {
    StartGame,
}

/// Requests a player connection may send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlayerRequest {
    JoinRequest {
        room_code: RoomCode,
        display_name: String,
    },
    Move {
        direction: Direction,
        pressed: bool,
    },
    Ability {
        code: AbilityCode,
    },
}

/// Requests a viewer connection may send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewerRequest {
    ViewRequest { room_code: RoomCode },
}

/// An inbound request tagged with the role of the connection it came
/// from. Built by the connection handler, never sent on the wire as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Owner(OwnerRequest),
    Player(PlayerRequest),
    Viewer(ViewerRequest),
}

// ---------------------------------------------------------------------------
// Shared payload pieces
// ---------------------------------------------------------------------------

/// `success` or `failure` in a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Success,
    Failure,
}

/// One player in a room's roster, in join order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub slot: Slot,
    pub display_name: String,
    /// Raw connection id; only filled in for viewers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<u64>,
}

/// Position and infection flag of one entity in a tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    pub position: Vec2,
    pub infected: bool,
}

/// The controller's abilities as every player sees them.
///
/// `cooling_down` and `active` map an ability to its remaining ticks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityState {
    pub available: Vec<AbilityCode>,
    pub cooling_down: BTreeMap<AbilityCode, u32>,
    #[serde(default)]
    pub active: BTreeMap<AbilityCode, u32>,
}

/// Answer to a player's `join_request`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinResponse {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<Slot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_controller: Option<bool>,
}

impl JoinResponse {
    pub fn success(slot: Slot, is_controller: bool) -> Self {
        Self {
            status: Status::Success,
            reason: None,
            slot: Some(slot),
            is_controller: Some(is_controller),
        }
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        Self {
            status: Status::Failure,
            reason: Some(reason.into()),
            slot: None,
            is_controller: None,
        }
    }
}

/// Answer to a viewer's `view_request`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewResponse {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roster: Option<Vec<RosterEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arena: Option<ArenaDescription>,
}

impl ViewResponse {
    pub fn success(roster: Vec<RosterEntry>, arena: ArenaDescription) -> Self {
        Self {
            status: Status::Success,
            reason: None,
            roster: Some(roster),
            arena: Some(arena),
        }
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        Self {
            status: Status::Failure,
            reason: Some(reason.into()),
            roster: None,
            arena: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// Messages delivered to an owner connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OwnerEvent {
    RoomCode {
        code: RoomCode,
    },
    PlayerJoined {
        roster: Vec<RosterEntry>,
        new_player_name: String,
    },
    /// `start_game` was refused; the room is unchanged.
    StartRejected {
        reason: String,
    },
}

/// Messages delivered to a player connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlayerEvent {
    JoinResponse(JoinResponse),
    GameStarting,
    GameOver { reason: GameOverReason },
    AbilityState(AbilityState),
}

/// Messages delivered to a viewer connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewerEvent {
    ViewResponse(ViewResponse),
    GameStarting {
        arena: ArenaDescription,
    },
    Tick {
        tick: u64,
        per_slot: BTreeMap<Slot, EntityState>,
    },
    GameOver {
        reason: GameOverReason,
    },
}

/// Anything the server sends, whatever the recipient's role.
///
/// Serialized untagged: the wire shows only the inner event's `"type"`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Outbound {
    Owner(OwnerEvent),
    Player(PlayerEvent),
    Viewer(ViewerEvent),
}

impl From<OwnerEvent> for Outbound {
    fn from(event: OwnerEvent) -> Self {
        Self::Owner(event)
    }
}

impl From<PlayerEvent> for Outbound {
    fn from(event: PlayerEvent) -> Self {
        Self::Player(event)
    }
}

impl From<ViewerEvent> for Outbound {
    fn from(event: ViewerEvent) -> Self {
        Self::Viewer(event)
    }
}
