//! Simulation tunables.

use serde::{Deserialize, Serialize};
use tracing::warn;
use zombeans_protocol::AbilityCode;

/// How long an ability lasts and how long it then cools down, in ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityTiming {
    pub duration_ticks: u32,
    pub cooldown_ticks: u32,
}

impl AbilityTiming {
    pub const fn new(duration_ticks: u32, cooldown_ticks: u32) -> Self {
        Self {
            duration_ticks,
            cooldown_ticks,
        }
    }
}

/// Every knob of the simulation.
///
/// Velocities are in arena units per second; `acceleration` is the change
/// applied per tick while a direction key is held.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Radius of every entity's circle. Default: 25.
    pub entity_radius: f32,
    /// Velocity change per tick along a held axis. Default: 40.
    pub acceleration: f32,
    /// Per-axis speed bound. Default: 200.
    pub max_velocity: f32,
    /// Multiplier on `acceleration` and `max_velocity` for healthy
    /// entities while SpeedUp is active. Default: 1.5.
    pub speed_up_factor: f32,
    /// The game ends with `SurvivorsWin` once more ticks than this have
    /// elapsed. Default: 6000 (one minute at 10 ms per tick).
    pub max_ticks: u64,
    pub freeze: AbilityTiming,
    pub speed_up: AbilityTiming,
    pub immune: AbilityTiming,
    /// Cure is instant; only its cooldown matters.
    pub cure: AbilityTiming,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            entity_radius: 25.0,
            acceleration: 40.0,
            max_velocity: 200.0,
            speed_up_factor: 1.5,
            max_ticks: 6_000,
            freeze: AbilityTiming::new(200, 1_000),
            speed_up: AbilityTiming::new(300, 800),
            immune: AbilityTiming::new(150, 1_200),
            cure: AbilityTiming::new(0, 2_000),
        }
    }
}

impl SimConfig {
    /// Smallest entity radius a validated config keeps.
    pub const MIN_RADIUS: f32 = 1.0;

    /// Fix values the step cannot work with.
    ///
    /// - `entity_radius` is finite and at least [`MIN_RADIUS`](Self::MIN_RADIUS).
    /// - `acceleration` and `max_velocity` are finite and not negative.
    /// - `speed_up_factor` is finite and at least 1.
    ///
    /// Non-finite values fall back to the default.
    pub fn validated(mut self) -> Self {
        let defaults = Self::default();
        self.entity_radius = at_least(
            "entity_radius",
            self.entity_radius,
            Self::MIN_RADIUS,
            defaults.entity_radius,
        );
        self.acceleration = at_least("acceleration", self.acceleration, 0.0, defaults.acceleration);
        self.max_velocity = at_least("max_velocity", self.max_velocity, 0.0, defaults.max_velocity);
        self.speed_up_factor = at_least(
            "speed_up_factor",
            self.speed_up_factor,
            1.0,
            defaults.speed_up_factor,
        );
        self
    }

    pub fn timing(&self, code: AbilityCode) -> AbilityTiming {
        match code {
            AbilityCode::Freeze => self.freeze,
            AbilityCode::SpeedUp => self.speed_up,
            AbilityCode::Immune => self.immune,
            AbilityCode::Cure => AbilityTiming::new(0, self.cure.cooldown_ticks),
        }
    }
}

fn at_least(field: &str, value: f32, min: f32, fallback: f32) -> f32 {
    if !value.is_finite() {
        warn!(field, value, fallback, "sim setting is not finite, using default");
        fallback
    } else if value < min {
        warn!(field, value, min, "sim setting below minimum, raising it");
        min
    } else {
        value
    }
}
