//! Virus.

use glam::Vec2;

/// A stationary hazard that detonates large cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Virus {
    pub id: u32,
    pub position: Vec2,
    pub radius: f32,
}

impl Virus {
    pub fn new(id: u32, position: Vec2, radius: f32) -> Self {
        Self { id, position, radius }
    }
}
