//! Player cell.

use super::cell::{area, radius_for_area};
use glam::Vec2;

/// A cell owned by exactly one player.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerCell {
    /// Unique node ID.
    pub node_id: u32,
    pub position: Vec2,
    pub radius: f32,
    pub velocity: Vec2,
    /// Seconds until this cell may merge with a sibling. Only the sign matters.
    pub merge_timer: f32,
}

impl PlayerCell {
    /// Create a resting cell that is immediately eligible to merge.
    pub fn new(node_id: u32, position: Vec2, radius: f32) -> Self {
        Self {
            node_id,
            position,
            radius,
            velocity: Vec2::ZERO,
            merge_timer: 0.0,
        }
    }

    #[inline]
    pub fn area(&self) -> f32 {
        area(self.radius)
    }

    /// Grow by the given area.
    #[inline]
    pub fn absorb(&mut self, other_area: f32) {
        self.radius = radius_for_area(self.area() + other_area);
    }

    /// Whether the merge cooldown has elapsed.
    #[inline]
    pub fn can_merge(&self) -> bool {
        self.merge_timer <= 0.0
    }

    /// Whether this cell's circle overlaps another circle.
    #[inline]
    pub fn overlaps(&self, position: Vec2, radius: f32) -> bool {
        let r = self.radius + radius;
        self.position.distance_squared(position) < r * r
    }
}
