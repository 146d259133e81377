//! World snapshot building.

use crate::entity::{Food, Player, PlayerCell, Virus};
use crate::world::World;
use protocol::{CellState, FoodState, LeaderboardEntry, PlayerState, Snapshot, VirusState};

/// Maximum leaderboard length.
pub const LEADERBOARD_SIZE: usize = 10;

/// Capture the full world state.
///
/// Eliminated players stay in `players` with no cells and rank with a
/// score of zero.
pub fn build(world: &World) -> Snapshot {
    Snapshot {
        foods: world.foods.iter().map(food_state).collect(),
        viruses: world.viruses.iter().map(virus_state).collect(),
        players: world.players.values().map(player_state).collect(),
        leaderboard: leaderboard(world),
    }
}

/// Top players by score, highest first. Ties keep registry order.
pub fn leaderboard(world: &World) -> Vec<LeaderboardEntry> {
    let mut entries: Vec<LeaderboardEntry> = world
        .players
        .values()
        .map(|p| LeaderboardEntry {
            name: p.name.clone(),
            score: p.score(),
        })
        .collect();
    // sort_by is stable
    entries.sort_by(|a, b| b.score.cmp(&a.score));
    entries.truncate(LEADERBOARD_SIZE);
    entries
}

fn food_state(food: &Food) -> FoodState {
    FoodState {
        id: food.id,
        x: food.position.x,
        y: food.position.y,
        radius: food.radius,
        color: food.color,
        vx: food.velocity.x,
        vy: food.velocity.y,
        is_ejected: food.is_ejected,
    }
}

fn virus_state(virus: &Virus) -> VirusState {
    VirusState {
        id: virus.id,
        x: virus.position.x,
        y: virus.position.y,
        radius: virus.radius,
    }
}

fn player_state(player: &Player) -> PlayerState {
    PlayerState {
        id: player.id,
        name: player.name.clone(),
        skin: player.skin,
        color: player.color,
        score: player.score(),
        cells: player.cells.iter().map(cell_state).collect(),
    }
}

fn cell_state(cell: &PlayerCell) -> CellState {
    CellState {
        x: cell.position.x,
        y: cell.position.y,
        radius: cell.radius,
        vx: cell.velocity.x,
        vy: cell.velocity.y,
        merge_timer: cell.merge_timer,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn world() -> World {
        let mut config = Config::default();
        config.world.size = 1000.0;
        config.world.food_count = 5;
        config.world.virus_count = 2;
        let mut world = World::with_seed(&config, 13);
        world.populate();
        world
    }

    fn set_radius(world: &mut World, id: u32, radius: f32) {
        world.players.get_mut(&id).unwrap().cells[0].radius = radius;
    }

    #[test]
    fn test_snapshot_mirrors_world() {
        let mut world = world();
        world.add_player(1, "alpha".to_string(), false);
        world.add_player(2, "beta".to_string(), true);
        world.players.get_mut(&2).unwrap().cells.clear();

        let snapshot = build(&world);

        assert_eq!(snapshot.foods.len(), 5);
        assert_eq!(snapshot.viruses.len(), 2);
        assert_eq!(snapshot.players.len(), 2);
        assert_eq!(snapshot.players[0].cells.len(), 1);
        assert_eq!(snapshot.players[0].score, world.players[&1].score());
        assert!(snapshot.players[1].cells.is_empty());
        assert_eq!(snapshot.leaderboard.len(), 2);
        assert_eq!(snapshot.leaderboard[0].name, "alpha");
        assert_eq!(snapshot.leaderboard[1].name, "beta");
        assert_eq!(snapshot.leaderboard[1].score, 0);
    }

    #[test]
    fn test_leaderboard_order_and_length() {
        let mut world = world();
        for id in 1..=12 {
            world.add_player(id, format!("p{id}"), false);
            set_radius(&mut world, id, 10.0 + id as f32);
        }
        let board = leaderboard(&world);

        assert_eq!(board.len(), LEADERBOARD_SIZE);
        assert_eq!(board[0].name, "p12");
        assert!(board.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_leaderboard_ties_keep_registry_order() {
        let mut world = world();
        for id in [3, 1, 2] {
            world.add_player(id, format!("p{id}"), false);
            set_radius(&mut world, id, 30.0);
        }
        let names: Vec<String> = leaderboard(&world).into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["p1", "p2", "p3"]);
    }
}
