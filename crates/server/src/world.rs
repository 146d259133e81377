//! World state management.
//!
//! The world is an arena owned by the tick scheduler: players keyed by id,
//! plus the food and virus collections. Nothing outside the scheduler
//! mutates it.

use crate::config::Config;
use crate::entity::{Food, Player, PlayerCell, Rgb, Virus};
use crate::spatial::Bounds;
use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

/// World border bounds. The world is square and centered at the origin.
#[derive(Debug, Clone, Copy)]
pub struct WorldBorder {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
    pub width: f32,
    pub height: f32,
}

impl WorldBorder {
    pub fn new(width: f32, height: f32) -> Self {
        let half_w = width / 2.0;
        let half_h = height / 2.0;
        Self {
            min_x: -half_w,
            min_y: -half_h,
            max_x: half_w,
            max_y: half_h,
            width,
            height,
        }
    }

    /// Root bounds for a spatial index over this world.
    #[inline]
    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.min_x, self.min_y, self.max_x, self.max_y)
    }

    /// Clamp a circle's center so its edge stays inside the border.
    #[inline]
    pub fn clamp_circle(&self, position: Vec2, radius: f32) -> Vec2 {
        Vec2::new(
            clamp_axis(position.x, self.min_x, self.max_x, radius),
            clamp_axis(position.y, self.min_y, self.max_y, radius),
        )
    }

    /// Get a random position at least `margin` away from every edge.
    pub fn random_position(&self, rng: &mut impl Rng, margin: f32) -> Vec2 {
        Vec2::new(
            random_axis(rng, self.min_x, self.max_x, margin),
            random_axis(rng, self.min_y, self.max_y, margin),
        )
    }
}

#[inline]
fn clamp_axis(value: f32, min: f32, max: f32, radius: f32) -> f32 {
    let lo = min + radius;
    let hi = max - radius;
    if lo > hi { (min + max) / 2.0 } else { value.clamp(lo, hi) }
}

fn random_axis(rng: &mut impl Rng, min: f32, max: f32, margin: f32) -> f32 {
    let lo = min + margin;
    let hi = max - margin;
    if lo < hi { rng.random_range(lo..hi) } else { (min + max) / 2.0 }
}

/// Monotonic node id allocator shared by cells, food and viruses.
#[derive(Debug)]
pub struct NodeIds {
    next: u32,
}

impl NodeIds {
    fn new() -> Self {
        Self { next: 1 }
    }

    /// Get the next node ID.
    pub fn next_id(&mut self) -> u32 {
        let id = self.next;
        self.next = self.next.wrapping_add(1);
        if self.next == 0 {
            self.next = 1; // Skip 0
        }
        id
    }
}

/// Player id source shared by the bot manager and the transport.
///
/// Ids are handed out in registration order, so registry order (id order)
/// is join order for bots and humans alike.
#[derive(Debug, Clone)]
pub struct PlayerIds(Arc<Mutex<u32>>);

impl PlayerIds {
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(1)))
    }

    /// Allocate the next id and run `register` with it before any other
    /// caller can allocate.
    pub fn register<T>(&self, register: impl FnOnce(u32) -> T) -> T {
        let mut next = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        let id = *next;
        *next += 1;
        register(id)
    }

    /// Allocate the next id.
    pub fn next_id(&self) -> u32 {
        self.register(|id| id)
    }
}

impl Default for PlayerIds {
    fn default() -> Self {
        Self::new()
    }
}

/// The game world.
#[derive(Debug)]
pub struct World {
    pub border: WorldBorder,
    /// Players keyed by id. Ids come from `player_ids`, so id order is join
    /// order and the iteration order of every pass.
    pub players: BTreeMap<u32, Player>,
    pub player_ids: PlayerIds,
    pub foods: Vec<Food>,
    pub viruses: Vec<Virus>,
    pub ids: NodeIds,
    pub rng: StdRng,
    food_count: usize,
    food_radius: f32,
    virus_count: usize,
    virus_radius: f32,
    start_radius: f32,
}

impl World {
    /// Create an empty world. Food and viruses are spawned by [`World::populate`].
    pub fn new(config: &Config) -> Self {
        let rng = if config.server.seed == 0 {
            StdRng::from_os_rng()
        } else {
            StdRng::seed_from_u64(config.server.seed)
        };
        Self::with_rng(config, rng)
    }

    /// Create an empty world with a fixed seed.
    pub fn with_seed(config: &Config, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: &Config, rng: StdRng) -> Self {
        let size = config.world.size;
        Self {
            border: WorldBorder::new(size, size),
            players: BTreeMap::new(),
            player_ids: PlayerIds::new(),
            foods: Vec::with_capacity(config.world.food_count),
            viruses: Vec::with_capacity(config.world.virus_count),
            ids: NodeIds::new(),
            rng,
            food_count: config.world.food_count,
            food_radius: config.world.food_radius,
            virus_count: config.world.virus_count,
            virus_radius: config.world.virus_radius,
            start_radius: config.player.start_radius,
        }
    }

    /// Spawn the initial food and viruses.
    pub fn populate(&mut self) {
        self.replenish_food();
        self.spawn_viruses();
    }

    #[inline]
    pub fn food_radius(&self) -> f32 {
        self.food_radius
    }

    /// Generate a random cosmetic color.
    pub fn random_color(rng: &mut impl Rng) -> Rgb {
        [
            rng.random_range(0.2..1.0),
            rng.random_range(0.2..1.0),
            rng.random_range(0.2..1.0),
        ]
    }

    /// Register a player and give them a starting cell.
    pub fn add_player(&mut self, id: u32, name: String, is_bot: bool) -> &mut Player {
        let color = Self::random_color(&mut self.rng);
        let mut player = Player::new(id, name, color, is_bot);
        player.cells.push(self.spawn_cell());
        self.players.entry(id).or_insert(player)
    }

    /// Remove a player and all of their cells.
    pub fn remove_player(&mut self, id: u32) -> Option<Player> {
        self.players.remove(&id)
    }

    /// Give an eliminated player a fresh starting cell. Returns false if the
    /// player is unknown or still alive.
    pub fn respawn_player(&mut self, id: u32) -> bool {
        let alive = match self.players.get(&id) {
            Some(player) => !player.is_eliminated(),
            None => return false,
        };
        if alive {
            return false;
        }
        let cell = self.spawn_cell();
        match self.players.get_mut(&id) {
            Some(player) => {
                player.direction = Vec2::ZERO;
                player.mouse_target = None;
                player.cells.push(cell);
                true
            }
            None => false,
        }
    }

    fn spawn_cell(&mut self) -> PlayerCell {
        let position = self.border.random_position(&mut self.rng, self.start_radius);
        PlayerCell::new(self.ids.next_id(), position, self.start_radius)
    }

    /// Top naturally spawned food up to the target count. Ejected pellets
    /// are not counted.
    pub fn replenish_food(&mut self) -> usize {
        let natural = self.foods.iter().filter(|f| !f.is_ejected).count();
        let missing = self.food_count.saturating_sub(natural);
        for _ in 0..missing {
            let position = self.border.random_position(&mut self.rng, self.food_radius);
            let color = Self::random_color(&mut self.rng);
            let id = self.ids.next_id();
            self.foods.push(Food::new(id, position, self.food_radius, color));
        }
        missing
    }

    /// Spawn viruses up to the target count.
    pub fn spawn_viruses(&mut self) {
        while self.viruses.len() < self.virus_count {
            let position = self.border.random_position(&mut self.rng, self.virus_radius);
            let id = self.ids.next_id();
            self.viruses.push(Virus::new(id, position, self.virus_radius));
        }
    }

    /// Total number of cells across all players.
    pub fn cell_count(&self) -> usize {
        self.players.values().map(|p| p.cells.len()).sum()
    }
}
