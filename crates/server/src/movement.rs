//! Movement integration.
//!
//! Every cell accelerates toward its owner's mouse target or along the raw
//! direction, then drag is applied, position integrated and clamped to the
//! border. Ejected pellets coast under their own, stronger drag.

use crate::config::Config;
use crate::entity::{Player, PlayerCell};
use crate::world::{World, WorldBorder};
use glam::Vec2;

/// Per-tick velocity multiplier applied to every cell.
pub const CELL_DRAG: f32 = 0.86;
/// Velocity multiplier while a cell is settling on its mouse target.
pub const SETTLE_DAMPING: f32 = 0.7;
/// Radius at which a cell moves at exactly `base_speed`.
const REFERENCE_RADIUS: f32 = 40.0;
/// Ejected pellets below this speed are stopped.
const EJECT_REST_SPEED: f32 = 1.0;

/// Acceleration for a cell of the given radius. Larger cells are slower.
#[inline]
pub fn cell_speed(base_speed: f32, radius: f32) -> f32 {
    base_speed / (radius / REFERENCE_RADIUS).sqrt()
}

/// Normalize a direction. A zero-length vector stays zero.
#[inline]
pub fn safe_normalize(direction: Vec2) -> Vec2 {
    let len = direction.length();
    let len = if len > 0.0 { len } else { 1.0 };
    direction / len
}

/// Advance every player cell and every moving pellet by `dt` seconds.
pub fn update(world: &mut World, config: &Config, dt: f32) {
    let border = world.border;
    for player in world.players.values_mut() {
        move_player(player, &border, config.player.base_speed, dt);
    }
    move_ejected(world, config.eject.drag, dt);
}

fn move_player(player: &mut Player, border: &WorldBorder, base_speed: f32, dt: f32) {
    let direction = safe_normalize(player.direction);
    let target = player.mouse_target;
    for cell in &mut player.cells {
        accelerate(cell, target, direction, base_speed, dt);
        cell.velocity *= CELL_DRAG;
        cell.position += cell.velocity * dt;
        cell.position = border.clamp_circle(cell.position, cell.radius);
        cell.merge_timer -= dt;
    }
}

fn accelerate(cell: &mut PlayerCell, target: Option<Vec2>, direction: Vec2, base_speed: f32, dt: f32) {
    let speed = cell_speed(base_speed, cell.radius);
    match target {
        Some(target) => {
            let to_target = target - cell.position;
            let distance = to_target.length();
            if distance > cell.radius * 0.5 {
                cell.velocity += to_target / distance * speed * dt;
            } else {
                cell.velocity *= SETTLE_DAMPING;
            }
        }
        None => cell.velocity += direction * speed * dt,
    }
}

fn move_ejected(world: &mut World, drag: f32, dt: f32) {
    let border = world.border;
    for food in world.foods.iter_mut().filter(|f| f.velocity != Vec2::ZERO) {
        food.position += food.velocity * dt;
        food.position = border.clamp_circle(food.position, food.radius);
        food.velocity *= drag;
        if food.velocity.length_squared() < EJECT_REST_SPEED * EJECT_REST_SPEED {
            food.velocity = Vec2::ZERO;
        }
    }
}
