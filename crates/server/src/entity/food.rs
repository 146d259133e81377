//! Food pellet.

use super::Rgb;
use glam::Vec2;

/// A food pellet, either a static spawn or mass ejected by a player.
#[derive(Debug, Clone, PartialEq)]
pub struct Food {
    pub id: u32,
    pub position: Vec2,
    pub radius: f32,
    pub color: Rgb,
    /// Nonzero only for ejected pellets still in flight.
    pub velocity: Vec2,
    pub is_ejected: bool,
}

impl Food {
    /// Create a static food pellet.
    pub fn new(id: u32, position: Vec2, radius: f32, color: Rgb) -> Self {
        Self {
            id,
            position,
            radius,
            color,
            velocity: Vec2::ZERO,
            is_ejected: false,
        }
    }

    /// Create a pellet ejected by a player.
    pub fn ejected(id: u32, position: Vec2, radius: f32, color: Rgb, velocity: Vec2) -> Self {
        Self {
            id,
            position,
            radius,
            color,
            velocity,
            is_ejected: true,
        }
    }
}
