//! A single moving circle in the arena.

use zombeans_protocol::{Direction, EntityState, Slot, Vec2};

/// One player's entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    slot: Slot,
    position: Vec2,
    velocity: Vec2,
    input: u8,
    infected: bool,
}

impl Entity {
    /// A healthy, motionless entity with no keys held.
    pub fn new(slot: Slot, position: Vec2) -> Self {
        Self {
            slot,
            position,
            velocity: Vec2::ZERO,
            input: 0,
            infected: false,
        }
    }

    pub fn infected(mut self) -> Self {
        self.infected = true;
        self
    }

    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn slot(&self) -> Slot {
        self.slot
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn is_infected(&self) -> bool {
        self.infected
    }

    pub fn is_pressed(&self, direction: Direction) -> bool {
        self.input & direction.bit() != 0
    }

    pub fn state(&self) -> EntityState {
        EntityState {
            position: self.position,
            infected: self.infected,
        }
    }

    pub(crate) fn set_pressed(&mut self, direction: Direction, pressed: bool) {
        if pressed {
            self.input |= direction.bit();
        } else {
            self.input &= !direction.bit();
        }
    }

    pub(crate) fn set_infected(&mut self, infected: bool) {
        self.infected = infected;
    }

    pub(crate) fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    pub(crate) fn set_velocity(&mut self, velocity: Vec2) {
        self.velocity = velocity;
    }

    /// `-1`, `0` or `+1` along x from the held keys.
    pub(crate) fn axis_x(&self) -> f32 {
        axis(self.is_pressed(Direction::Right), self.is_pressed(Direction::Left))
    }

    /// `-1`, `0` or `+1` along y. `Up` points towards `y = 0`.
    pub(crate) fn axis_y(&self) -> f32 {
        axis(self.is_pressed(Direction::Down), self.is_pressed(Direction::Up))
    }
}

fn axis(positive: bool, negative: bool) -> f32 {
    match (positive, negative) {
        (true, false) => 1.0,
        (false, true) => -1.0,
        _ => 0.0,
    }
}
