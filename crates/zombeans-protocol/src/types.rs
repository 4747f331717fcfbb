//! Shared data model: identities, geometry, and the small enums every
//! layer of the server agrees on.

use std::fmt;
use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A player's fixed position in the join order of a room.
///
/// The slot decides the player's role (seed, controller, survivor) and
/// names the player's entity inside the simulation. It is assigned once
/// at join time and never reassigned.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Slot(pub u32);

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}", self.0)
    }
}

/// The short, human-typeable code that identifies a live room.
///
/// Codes are compared case-insensitively: construction trims whitespace
/// and upper-cases, so a player typing `abcdef ` reaches room `ABCDEF`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct RoomCode(String);

impl RoomCode {
    /// Number of characters in a generated room code.
    pub const LEN: usize = 6;

    /// Creates a room code, normalising case and surrounding whitespace.
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_ascii_uppercase())
    }

    /// The normalised code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for RoomCode {
    fn from(code: String) -> Self {
        Self::new(code)
    }
}

impl From<RoomCode> for String {
    fn from(code: RoomCode) -> Self {
        code.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Connection roles
// ---------------------------------------------------------------------------

/// The kind of remote peer behind a connection.
///
/// Each role may send only its own requests; the transport tells the
/// server which role a connection has by the path it connected to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Creates and owns exactly one room; starts the game.
    Owner,
    /// Joins a room and controls one entity.
    Player,
    /// Watches a room's ticks without taking part.
    Viewer,
}

impl Role {
    /// Maps a connection request path to a role.
    ///
    /// `/host` is accepted as an alias for `/owner`.
    pub fn from_path(path: &str) -> Option<Self> {
        match path.trim_end_matches('/') {
            "/owner" | "/host" => Some(Self::Owner),
            "/player" => Some(Self::Player),
            "/viewer" => Some(Self::Viewer),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Owner => write!(f, "owner"),
            Self::Player => write!(f, "player"),
            Self::Viewer => write!(f, "viewer"),
        }
    }
}

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// A 2-D vector in arena units. The arena origin is the top-left corner
/// and `y` grows downwards.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Squared length; cheaper than `length` for distance comparisons.
    pub fn length_squared(self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }
}

impl Add for Vec2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

/// What an observer needs to draw the arena.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArenaDescription {
    pub width: f32,
    pub height: f32,
    pub entity_radius: f32,
}

// ---------------------------------------------------------------------------
// Input and abilities
// ---------------------------------------------------------------------------

/// One of the four movement keys. Each is pressed or released
/// independently of the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// The bit this direction occupies in an entity's input bitmask.
    pub fn bit(self) -> u8 {
        match self {
            Self::Up => 0b0001,
            Self::Down => 0b0010,
            Self::Left => 0b0100,
            Self::Right => 0b1000,
        }
    }
}

/// The controller's timed abilities.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AbilityCode {
    /// Infected entities stop moving.
    Freeze,
    /// Healthy entities accelerate and top out faster.
    SpeedUp,
    /// No new infections happen.
    Immune,
    /// Every infected entity is healthy again (one-shot).
    Cure,
}

impl AbilityCode {
    pub const ALL: [Self; 4] = [Self::Freeze, Self::SpeedUp, Self::Immune, Self::Cure];
}

impl fmt::Display for AbilityCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Freeze => write!(f, "freeze"),
            Self::SpeedUp => write!(f, "speed_up"),
            Self::Immune => write!(f, "immune"),
            Self::Cure => write!(f, "cure"),
        }
    }
}

// ---------------------------------------------------------------------------
// Game results
// ---------------------------------------------------------------------------

/// The result of evaluating the win conditions after a tick.
///
/// Exactly one variant holds after every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The game goes on.
    None,
    /// Every non-controller entity is infected.
    InfectedWin,
    /// The tick limit passed with at least one healthy entity left.
    SurvivorsWin,
}

impl Outcome {
    /// `true` for the two outcomes that end the game.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Why a `game_over` notification was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOverReason {
    InfectedWin,
    SurvivorsWin,
    /// The room owner went away; the room no longer exists.
    SessionEnded,
}

impl GameOverReason {
    /// The reason matching a terminal simulation outcome.
    pub fn from_outcome(outcome: Outcome) -> Option<Self> {
        match outcome {
            Outcome::None => None,
            Outcome::InfectedWin => Some(Self::InfectedWin),
            Outcome::SurvivorsWin => Some(Self::SurvivorsWin),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_serializes_as_plain_number() {
        let json = serde_json::to_string(&Slot(3)).unwrap();
        assert_eq!(json, "3");
        assert_eq!(Slot(3).to_string(), "S-3");
    }

    #[test]
    fn test_room_code_normalises_case_and_whitespace() {
        assert_eq!(RoomCode::new("  abCdeF "), RoomCode::new("ABCDEF"));
        assert_eq!(RoomCode::new("abcdef").as_str(), "ABCDEF");
    }

    #[test]
    fn test_room_code_deserializes_normalised() {
        let code: RoomCode = serde_json::from_str("\"qwerty\"").unwrap();
        assert_eq!(code.as_str(), "QWERTY");
        assert_eq!(serde_json::to_string(&code).unwrap(), "\"QWERTY\"");
    }

    #[test]
    fn test_role_from_path() {
        assert_eq!(Role::from_path("/owner"), Some(Role::Owner));
        assert_eq!(Role::from_path("/host"), Some(Role::Owner));
        assert_eq!(Role::from_path("/player/"), Some(Role::Player));
        assert_eq!(Role::from_path("/viewer"), Some(Role::Viewer));
        assert_eq!(Role::from_path("/admin"), None);
        assert_eq!(Role::from_path("/"), None);
    }

    #[test]
    fn test_direction_bits_are_distinct() {
        let all = [Direction::Up, Direction::Down, Direction::Left, Direction::Right];
        let combined = all.iter().fold(0u8, |acc, d| {
            assert_eq!(acc & d.bit(), 0, "{d:?} overlaps another direction");
            acc | d.bit()
        });
        assert_eq!(combined, 0b1111);
    }

    #[test]
    fn test_vec2_arithmetic() {
        let a = Vec2::new(3.0, 4.0);
        assert_eq!(a.length(), 5.0);
        assert_eq!(a - Vec2::new(1.0, 1.0), Vec2::new(2.0, 3.0));
        assert_eq!(a * 2.0, Vec2::new(6.0, 8.0));
    }

    #[test]
    fn test_ability_code_wire_names() {
        let json = serde_json::to_string(&AbilityCode::SpeedUp).unwrap();
        assert_eq!(json, "\"speed_up\"");
        let code: AbilityCode = serde_json::from_str("\"cure\"").unwrap();
        assert_eq!(code, AbilityCode::Cure);
    }

    #[test]
    fn test_outcome_terminal_and_reason() {
        assert!(!Outcome::None.is_terminal());
        assert!(Outcome::InfectedWin.is_terminal());
        assert_eq!(GameOverReason::from_outcome(Outcome::None), None);
        assert_eq!(
            GameOverReason::from_outcome(Outcome::SurvivorsWin),
            Some(GameOverReason::SurvivorsWin)
        );
    }
}
