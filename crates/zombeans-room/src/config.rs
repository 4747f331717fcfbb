//! Room configuration and state machine.

use serde::{Deserialize, Serialize};
use tracing::warn;
use zombeans_protocol::Slot;
use zombeans_sim::{Arena, SimConfig};
use zombeans_tick::TickConfig;

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Configuration shared by every room a server creates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    /// Minimum players required to start the game.
    pub min_players: usize,

    /// Maximum players allowed in the room.
    pub max_players: usize,

    /// Slot that becomes the controller, if a player holds it at start.
    /// `None` disables the controller role.
    pub controller_slot: Option<Slot>,

    /// Slot whose entity starts infected.
    pub seed_slot: Slot,

    pub arena: Arena,

    pub tick: TickConfig,

    pub sim: SimConfig,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            min_players: 3,
            max_players: 10,
            controller_slot: Some(Slot(1)),
            seed_slot: Slot(0),
            arena: Arena::default(),
            tick: TickConfig::default(),
            sim: SimConfig::default(),
        }
    }
}

impl RoomConfig {
    /// Fix values that would make a room unusable.
    ///
    /// - `min_players` is at least 1 and `max_players` at least `min_players`.
    /// - A controller slot equal to the seed slot is dropped, since the
    ///   controller can never be infected.
    /// - Arena sides that are not finite and positive fall back to the
    ///   default size.
    /// - Simulation and tick settings go through their own `validated`.
    pub fn validated(mut self) -> Self {
        if self.min_players == 0 {
            self.min_players = 1;
        }
        if self.max_players < self.min_players {
            warn!(
                min = self.min_players,
                max = self.max_players,
                "max_players below min_players, raising it"
            );
            self.max_players = self.min_players;
        }
        if self.controller_slot == Some(self.seed_slot) {
            warn!(slot = %self.seed_slot, "controller slot is the seed slot, disabling controller");
            self.controller_slot = None;
        }
        let default_arena = Arena::default();
        self.arena.width = arena_side("width", self.arena.width, default_arena.width);
        self.arena.height = arena_side("height", self.arena.height, default_arena.height);
        self.sim = self.sim.validated();
        self.tick = self.tick.validated();
        self
    }
}

fn arena_side(side: &str, value: f32, fallback: f32) -> f32 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        warn!(side, value, fallback, "arena side unusable, using default");
        fallback
    }
}

// ---------------------------------------------------------------------------
// RoomState
// ---------------------------------------------------------------------------

/// The lifecycle state of a room.
///
/// ```text
/// Lobby → Running → Finished
///   └───────────────↗
/// ```
///
/// - **Lobby**: accepting joins, waiting for the owner to start.
/// - **Running**: the simulation ticks and accepts input.
/// - **Finished**: terminal. The game was decided or the owner left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomState {
    Lobby,
    Running,
    Finished,
}

impl RoomState {
    /// Returns `true` if the room is accepting new players.
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::Lobby)
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished)
    }

    /// The state the normal game flow moves to next.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Lobby => Some(Self::Running),
            Self::Running => Some(Self::Finished),
            Self::Finished => None,
        }
    }

    /// Returns `true` if moving to `target` is legal.
    ///
    /// Besides [`next`](Self::next), any non-terminal state may jump
    /// straight to `Finished` (the owner left).
    pub fn can_transition_to(self, target: Self) -> bool {
        self.next() == Some(target) || (target == Self::Finished && !self.is_terminal())
    }
}

impl std::fmt::Display for RoomState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lobby => write!(f, "Lobby"),
            Self::Running => write!(f, "Running"),
            Self::Finished => write!(f, "Finished"),
        }
    }
}
