use crate::entity::{Food, Player, PlayerCell};
use crate::movement::safe_normalize;
use glam::Vec2;
use rand::Rng;

/// Bot names to use.
const BOT_NAMES: &[&str] = &[
    "Bot", "Hunter", "Hungry", "Nomnom", "Blob", "Cell", "Eater", "Seeker",
    "Roamer", "Wanderer", "Ghost", "Shadow", "Swift", "Tiny", "Big", "Mega",
];

/// A cell this much larger (by radius) than the bot is a threat.
pub const THREAT_RATIO: f32 = 1.2;
/// A cell this much smaller (by radius) than the bot is prey.
pub const PREY_RATIO: f32 = 0.8;

/// Pick a display name for a new bot.
pub fn bot_name(rng: &mut impl Rng, id: u32) -> String {
    let name_idx = rng.random_range(0..BOT_NAMES.len());
    format!("{}{}", BOT_NAMES[name_idx], id % 100)
}

/// What a bot wants to do this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BotDecision {
    /// Unit direction, or zero to drift to a stop.
    pub direction: Vec2,
    pub split: bool,
}

impl BotDecision {
    const IDLE: Self = Self {
        direction: Vec2::ZERO,
        split: false,
    };
}

/// Nearest candidate seen so far, compared by squared distance.
#[derive(Debug, Clone, Copy)]
struct Nearest {
    position: Vec2,
    dist_sq: f32,
}

impl Nearest {
    fn offer(best: &mut Option<Nearest>, position: Vec2, dist_sq: f32) {
        if best.is_none_or(|b| dist_sq < b.dist_sq) {
            *best = Some(Nearest { position, dist_sq });
        }
    }
}

/// Decide where the bot's primary cell should go.
///
/// Fleeing the nearest threat takes priority. Otherwise the bot heads for
/// the nearest of all food and prey; food is scanned first so a prey cell
/// wins only when strictly closer. While chasing, the bot splits with
/// probability `split_chance`.
pub fn decide<'a>(
    bot_id: u32,
    cell: &PlayerCell,
    foods: &[Food],
    players: impl IntoIterator<Item = &'a Player>,
    rng: &mut impl Rng,
    split_chance: f32,
) -> BotDecision {
    let mut target: Option<Nearest> = None;
    for food in foods {
        Nearest::offer(&mut target, food.position, cell.position.distance_squared(food.position));
    }

    let mut threat: Option<Nearest> = None;
    for other in players.into_iter().filter(|p| p.id != bot_id) {
        for other_cell in &other.cells {
            let dist_sq = cell.position.distance_squared(other_cell.position);
            if other_cell.radius > cell.radius * THREAT_RATIO {
                Nearest::offer(&mut threat, other_cell.position, dist_sq);
            } else if other_cell.radius < cell.radius * PREY_RATIO {
                Nearest::offer(&mut target, other_cell.position, dist_sq);
            }
        }
    }

    if let Some(threat) = threat {
        return BotDecision {
            direction: safe_normalize(cell.position - threat.position),
            split: false,
        };
    }
    match target {
        Some(target) => BotDecision {
            direction: safe_normalize(target.position - cell.position),
            split: rng.random::<f32>() < split_chance,
        },
        None => BotDecision::IDLE,
    }
}
