//! Player record (human or bot).

use super::{PlayerCell, Rgb};
use glam::Vec2;

/// A participant owning an ordered sequence of cells.
#[derive(Debug, Clone)]
pub struct Player {
    /// Unique player ID.
    pub id: u32,
    pub name: String,
    pub skin: u32,
    pub color: Rgb,
    /// Owned cells. Empty means eliminated.
    pub cells: Vec<PlayerCell>,
    /// Raw desired direction (not necessarily normalized).
    pub direction: Vec2,
    /// Absolute point to steer toward; overrides `direction` for movement.
    pub mouse_target: Option<Vec2>,
    pub is_bot: bool,
}

impl Player {
    pub fn new(id: u32, name: String, color: Rgb, is_bot: bool) -> Self {
        Self {
            id,
            name,
            skin: 0,
            color,
            cells: Vec::new(),
            direction: Vec2::ZERO,
            mouse_target: None,
            is_bot,
        }
    }

    /// Score derived from total area: `floor(Σ area / 10)`.
    pub fn score(&self) -> u64 {
        let total: f32 = self.cells.iter().map(PlayerCell::area).sum();
        (total / 10.0).floor() as u64
    }

    #[inline]
    pub fn is_eliminated(&self) -> bool {
        self.cells.is_empty()
    }

    /// Find an owned cell by node id.
    pub fn cell(&self, node_id: u32) -> Option<&PlayerCell> {
        self.cells.iter().find(|c| c.node_id == node_id)
    }

    pub fn cell_mut(&mut self, node_id: u32) -> Option<&mut PlayerCell> {
        self.cells.iter_mut().find(|c| c.node_id == node_id)
    }

    /// Remove an owned cell by node id.
    pub fn remove_cell(&mut self, node_id: u32) -> Option<PlayerCell> {
        let idx = self.cells.iter().position(|c| c.node_id == node_id)?;
        Some(self.cells.remove(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_is_floored_area_over_ten() {
        let mut player = Player::new(1, "p".to_string(), [1.0, 0.0, 0.0], false);
        assert_eq!(player.score(), 0);
        player.cells.push(PlayerCell::new(1, Vec2::ZERO, 40.0));
        // π·1600 / 10 = 502.65
        assert_eq!(player.score(), 502);
        player.cells.push(PlayerCell::new(2, Vec2::ZERO, 10.0));
        // (π·1600 + π·100) / 10 = 534.07
        assert_eq!(player.score(), 534);
    }

    #[test]
    fn test_remove_cell_by_node_id() {
        let mut player = Player::new(1, "p".to_string(), [1.0, 0.0, 0.0], false);
        player.cells.push(PlayerCell::new(5, Vec2::ZERO, 10.0));
        player.cells.push(PlayerCell::new(6, Vec2::ONE, 10.0));
        assert_eq!(player.remove_cell(5).map(|c| c.node_id), Some(5));
        assert!(player.remove_cell(5).is_none());
        assert_eq!(player.cells[0].node_id, 6);
        assert!(!player.is_eliminated());
    }
}
