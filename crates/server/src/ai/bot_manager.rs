use super::bot_player::{bot_name, decide};
use crate::config::Config;
use crate::world::World;
use tracing::debug;

/// Bot manager.
#[derive(Debug, Default)]
pub struct BotManager {
    /// Player IDs of active bots, in spawn order.
    pub bots: Vec<u32>,
}

impl BotManager {
    /// Create a new bot manager.
    pub fn new() -> Self {
        Self { bots: Vec::new() }
    }

    /// Add a new bot to the world. Its id comes from the same allocator as
    /// connecting players.
    pub fn add_bot(&mut self, world: &mut World) -> u32 {
        let id = world.player_ids.next_id();
        let name = bot_name(&mut world.rng, id);
        world.add_player(id, name, true);
        self.bots.push(id);
        id
    }

    /// Add `count` bots.
    pub fn spawn(&mut self, world: &mut World, count: usize) {
        for _ in 0..count {
            self.add_bot(world);
        }
    }

    /// Give every eliminated bot a fresh starting cell.
    pub fn respawn_eliminated(&self, world: &mut World) -> usize {
        let mut respawned = 0;
        for &id in &self.bots {
            if world.respawn_player(id) {
                debug!("Bot {} respawned", id);
                respawned += 1;
            }
        }
        respawned
    }

    /// Steer every living bot from its first cell.
    ///
    /// Returns the IDs of bots that want to split this tick.
    pub fn update(&self, world: &mut World, config: &Config) -> Vec<u32> {
        let mut splits = Vec::new();
        for &id in &self.bots {
            let Some(cell) = world.players.get(&id).and_then(|p| p.cells.first()).cloned() else {
                continue;
            };
            let decision = decide(
                id,
                &cell,
                &world.foods,
                world.players.values(),
                &mut world.rng,
                config.bot.split_chance,
            );
            if let Some(player) = world.players.get_mut(&id) {
                player.direction = decision.direction;
                player.mouse_target = None;
            }
            if decision.split {
                splits.push(id);
            }
        }
        splits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    fn setup() -> (World, Config) {
        let mut config = Config::default();
        config.world.size = 1000.0;
        config.world.food_count = 0;
        config.world.virus_count = 0;
        (World::with_seed(&config, 8), config)
    }

    #[test]
    fn test_spawned_bots_are_registered_players() {
        let (mut world, _) = setup();
        let mut bots = BotManager::new();
        bots.spawn(&mut world, 3);

        assert_eq!(bots.bots.len(), 3);
        assert_eq!(bots.bots, vec![1, 2, 3]);
        for id in &bots.bots {
            let player = &world.players[id];
            assert!(player.is_bot);
            assert_eq!(player.cells.len(), 1);
        }
        // The next player to register lines up behind the bots.
        assert_eq!(world.player_ids.next_id(), 4);
    }

    #[test]
    fn test_eliminated_bots_respawn() {
        let (mut world, _) = setup();
        let mut bots = BotManager::new();
        bots.spawn(&mut world, 2);
        let first = bots.bots[0];
        world.players.get_mut(&first).unwrap().cells.clear();

        assert_eq!(bots.respawn_eliminated(&mut world), 1);
        assert_eq!(world.players[&first].cells.len(), 1);
        assert_eq!(bots.respawn_eliminated(&mut world), 0);
    }

    #[test]
    fn test_update_steers_living_bots_toward_food() {
        let (mut world, config) = setup();
        let mut bots = BotManager::new();
        let id = bots.add_bot(&mut world);
        world.players.get_mut(&id).unwrap().cells[0].position = Vec2::ZERO;
        let food_id = world.ids.next_id();
        world.foods.push(crate::entity::Food::new(food_id, Vec2::new(0.0, 50.0), 10.0, [1.0, 1.0, 1.0]));

        bots.update(&mut world, &config);
        assert_eq!(world.players[&id].direction, Vec2::new(0.0, 1.0));

        // An eliminated bot is left alone.
        world.players.get_mut(&id).unwrap().cells.clear();
        world.players.get_mut(&id).unwrap().direction = Vec2::ZERO;
        assert!(bots.update(&mut world, &config).is_empty());
        assert_eq!(world.players[&id].direction, Vec2::ZERO);
    }
}
