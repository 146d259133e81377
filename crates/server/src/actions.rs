//! Player-triggered actions: split and eject.

use crate::config::Config;
use crate::entity::{Food, PlayerCell, area, radius_for_area};
use crate::movement::safe_normalize;
use crate::world::World;
use glam::Vec2;
use tracing::debug;

/// Distance between split siblings, in multiples of the new radius.
const SPLIT_SPACING: f32 = 2.5;
/// Share of the spacing the original cell is pulled back by.
const SPLIT_PULLBACK: f32 = 0.3;

/// Split every cell of `player_id` with `radius >= min_split_radius`.
///
/// Each eligible cell halves its radius and spawns a sibling of the same
/// size ahead of it along the player's direction. Returns the number of new
/// cells. Nothing happens when the direction is zero-length.
pub fn split(world: &mut World, config: &Config, player_id: u32) -> usize {
    let border = world.border;
    let Some(player) = world.players.get_mut(&player_id) else {
        return 0;
    };
    let direction = safe_normalize(player.direction);
    if direction == Vec2::ZERO {
        return 0;
    }

    let merge_time = config.player.merge_time;
    let mut spawned = Vec::new();
    for cell in player.cells.iter_mut() {
        if cell.radius < config.player.min_split_radius {
            continue;
        }
        cell.radius *= 0.5;
        cell.merge_timer = merge_time;

        let spacing = SPLIT_SPACING * cell.radius;
        let origin = cell.position;
        cell.position = border.clamp_circle(origin - direction * spacing * SPLIT_PULLBACK, cell.radius);

        let mut sibling = PlayerCell::new(
            world.ids.next_id(),
            border.clamp_circle(origin + direction * spacing * (1.0 - SPLIT_PULLBACK), cell.radius),
            cell.radius,
        );
        sibling.velocity = direction * config.player.split_speed;
        sibling.merge_timer = merge_time;
        spawned.push(sibling);
    }

    let count = spawned.len();
    player.cells.extend(spawned);
    if count > 0 {
        debug!("Player {} split {} cells", player_id, count);
    }
    count
}

/// Eject a pellet from every cell of `player_id` with `radius >= min_eject_radius`.
///
/// Each eligible cell loses twice a food pellet's area; the pellet itself
/// carries one pellet's area, so mass is lost overall. Returns the number of
/// pellets spawned. Nothing happens when the direction is zero-length.
pub fn eject(world: &mut World, config: &Config, player_id: u32) -> usize {
    let border = world.border;
    let food_radius = world.food_radius();
    let Some(player) = world.players.get_mut(&player_id) else {
        return 0;
    };
    let direction = safe_normalize(player.direction);
    if direction == Vec2::ZERO {
        return 0;
    }

    let loss = 2.0 * area(food_radius);
    let mut count = 0;
    for cell in player.cells.iter_mut() {
        if cell.radius < config.player.min_eject_radius {
            continue;
        }
        let remaining = cell.area() - loss;
        if remaining <= 0.0 {
            continue;
        }
        cell.radius = radius_for_area(remaining);

        let position = border.clamp_circle(cell.position + direction * (cell.radius + food_radius), food_radius);
        world.foods.push(Food::ejected(
            world.ids.next_id(),
            position,
            food_radius,
            player.color,
            direction * config.eject.speed,
        ));
        count += 1;
    }
    count
}
