//! The bounded playing field.

use std::f32::consts::TAU;

use serde::{Deserialize, Serialize};
use zombeans_protocol::{ArenaDescription, Vec2};

/// An axis-aligned rectangle with its origin at `(0, 0)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Arena {
    pub width: f32,
    pub height: f32,
}

impl Default for Arena {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
        }
    }
}

impl Arena {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }

    /// Moves a circle's centre back inside the arena so the whole circle
    /// fits. On an axis narrower than the circle the centre is pinned to
    /// the middle of that axis.
    pub fn clamp(&self, position: Vec2, radius: f32) -> Vec2 {
        Vec2::new(
            clamp_axis(position.x, radius, self.width),
            clamp_axis(position.y, radius, self.height),
        )
    }

    /// Whether a circle at `position` lies entirely inside the arena.
    pub fn contains(&self, position: Vec2, radius: f32) -> bool {
        self.clamp(position, radius) == position
    }

    /// `count` points evenly spaced on a ring around the centre, with a
    /// radius of one third of the shorter side. The first point lies
    /// straight right of the centre.
    pub fn ring_positions(&self, count: usize) -> Vec<Vec2> {
        let center = self.center();
        let ring = self.width.min(self.height) / 3.0;
        (0..count)
            .map(|i| {
                let angle = TAU * i as f32 / count as f32;
                center + Vec2::new(angle.cos(), angle.sin()) * ring
            })
            .collect()
    }

    /// What a viewer needs to draw this arena.
    pub fn describe(&self, entity_radius: f32) -> ArenaDescription {
        ArenaDescription {
            width: self.width,
            height: self.height,
            entity_radius,
        }
    }
}

fn clamp_axis(value: f32, radius: f32, extent: f32) -> f32 {
    if extent < 2.0 * radius {
        extent / 2.0
    } else {
        value.clamp(radius, extent - radius)
    }
}
