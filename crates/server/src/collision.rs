//! Collision detection and resolution.
//!
//! Four passes run in a fixed order every tick, each observing the results
//! of the previous one:
//! 1. cells eat food
//! 2. cells eat smaller cells of other players
//! 3. large cells touching a virus explode
//! 4. sibling cells whose merge timers expired merge
//!
//! The QuadTree is only a broad phase; every candidate is re-checked with
//! exact circle geometry.

use crate::config::Config;
use crate::entity::{PlayerCell, area, radius_for_area};
use crate::spatial::{Bounds, QuadItem, QuadTree};
use crate::world::{NodeIds, World, WorldBorder};
use fixedbitset::FixedBitSet;
use glam::Vec2;
use rand::Rng;
use std::f32::consts::TAU;
use tracing::{debug, trace};

/// Player must be 15% larger (by radius) to eat another cell.
pub const PLAYER_EAT_MULT: f32 = 1.15;
/// Eating range shrinks by this share of the prey's radius.
pub const EAT_OVERLAP: f32 = 0.25;
/// A cell must be 10% larger than a virus to detonate on it.
pub const VIRUS_POP_MULT: f32 = 1.1;
/// Area per explosion fragment before clamping.
const EXPLOSION_AREA_PER_PIECE: f32 = 2000.0;
const EXPLOSION_MIN_PIECES: usize = 8;
const EXPLOSION_MAX_PIECES: usize = 16;
/// Outward speed of explosion fragments.
const EXPLOSION_SPEED: f32 = 200.0;
/// Fragments wait this multiple of the merge time before re-merging.
const EXPLOSION_MERGE_MULT: f32 = 1.2;

/// Whether `eater` can consume `prey` (radius ratio and overlap depth).
#[inline]
pub fn can_eat_cell(eater: &PlayerCell, prey: &PlayerCell) -> bool {
    if eater.radius <= prey.radius * PLAYER_EAT_MULT {
        return false;
    }
    let reach = eater.radius - prey.radius * EAT_OVERLAP;
    eater.position.distance_squared(prey.position) < reach * reach
}

/// Broad-phase box of side `4 * radius` around a cell.
#[inline]
fn search_box(cell: &PlayerCell) -> Bounds {
    Bounds::from_center(cell.position.x, cell.position.y, cell.radius * 2.0)
}

/// A non-owning reference to a cell, valid for one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CellRef {
    owner: u32,
    node_id: u32,
}

impl World {
    fn cell_at(&self, at: CellRef) -> Option<&PlayerCell> {
        self.players.get(&at.owner)?.cell(at.node_id)
    }
}

/// Cells eat food. Dead food is purged and the total topped back up.
///
/// A cell that grows is pushed back inside the border. Returns the number
/// of pellets eaten.
pub fn eat_food(world: &mut World, config: &Config) -> usize {
    let border = world.border;
    let mut tree = QuadTree::new(
        world.border.bounds(),
        config.spatial.food_capacity,
        config.spatial.max_depth,
    );
    for (idx, food) in world.foods.iter().enumerate() {
        if !tree.insert(QuadItem::new(idx as u32, food.position.x, food.position.y, food.radius)) {
            debug!("Food {} outside the world at {:?}", food.id, food.position);
        }
    }
    trace!("Food index: {} items, depth {}", tree.len(), tree.depth());

    let mut dead = FixedBitSet::with_capacity(world.foods.len());
    let foods = &world.foods;
    for player in world.players.values_mut() {
        for cell in player.cells.iter_mut() {
            for idx in tree.query(&search_box(cell)) {
                let idx = idx as usize;
                if dead.contains(idx) {
                    continue;
                }
                let food = &foods[idx];
                if cell.overlaps(food.position, food.radius) {
                    cell.absorb(area(food.radius));
                    cell.position = border.clamp_circle(cell.position, cell.radius);
                    dead.insert(idx);
                }
            }
        }
    }

    let eaten = dead.count_ones(..);
    if eaten > 0 {
        let mut idx = 0;
        world.foods.retain(|_| {
            let keep = !dead.contains(idx);
            idx += 1;
            keep
        });
    }
    world.replenish_food();
    eaten
}

/// Cells eat smaller cells belonging to other players.
///
/// Victims are removed from their owner immediately. References to cells
/// that are gone (eaten earlier in this pass) are skipped by looking the
/// cell up again before every test. Returns the number of cells eaten.
pub fn eat_cells(world: &mut World, config: &Config) -> usize {
    let border = world.border;
    let refs: Vec<CellRef> = world
        .players
        .values()
        .flat_map(|p| p.cells.iter().map(move |c| CellRef { owner: p.id, node_id: c.node_id }))
        .collect();

    let mut tree = QuadTree::new(
        world.border.bounds(),
        config.spatial.cell_capacity,
        config.spatial.max_depth,
    );
    for (idx, at) in refs.iter().enumerate() {
        if let Some(cell) = world.cell_at(*at) {
            tree.insert(QuadItem::new(idx as u32, cell.position.x, cell.position.y, cell.radius));
        }
    }

    let mut eaten = 0;
    for &eater in &refs {
        let Some(range) = world.cell_at(eater).map(search_box) else {
            continue;
        };
        for idx in tree.query(&range) {
            let prey = refs[idx as usize];
            if prey.owner == eater.owner {
                continue;
            }
            let (Some(eater_cell), Some(prey_cell)) = (world.cell_at(eater), world.cell_at(prey)) else {
                continue;
            };
            if !can_eat_cell(eater_cell, prey_cell) {
                continue;
            }

            let Some(victim) = world.players.get_mut(&prey.owner).and_then(|p| p.remove_cell(prey.node_id)) else {
                continue;
            };
            if let Some(cell) = world.players.get_mut(&eater.owner).and_then(|p| p.cell_mut(eater.node_id)) {
                cell.absorb(victim.area());
                cell.position = border.clamp_circle(cell.position, cell.radius);
            }
            eaten += 1;
            debug!(
                "Cell {} of player {} ate cell {} of player {}",
                eater.node_id, eater.owner, prey.node_id, prey.owner
            );
        }
    }
    eaten
}

/// Cells larger than a touching virus explode; the virus relocates.
///
/// Fragments replace the exploded cell in place and are not re-tested in
/// the same pass. Returns the number of explosions.
pub fn pop_viruses(world: &mut World, config: &Config) -> usize {
    let border = world.border;
    let mut pops = 0;
    for player in world.players.values_mut() {
        let mut i = 0;
        while i < player.cells.len() {
            let cell = &player.cells[i];
            let hit = world
                .viruses
                .iter()
                .position(|v| cell.overlaps(v.position, v.radius) && cell.radius > v.radius * VIRUS_POP_MULT);
            let Some(virus_idx) = hit else {
                i += 1;
                continue;
            };

            let fragments = explode(cell, config, &border, &mut world.ids, &mut world.rng);
            debug!(
                "Player {} cell {} (radius {:.1}) popped on virus {} into {} pieces",
                player.id,
                cell.node_id,
                cell.radius,
                world.viruses[virus_idx].id,
                fragments.len()
            );
            let count = fragments.len();
            player.cells.splice(i..=i, fragments);
            i += count;

            let virus = &mut world.viruses[virus_idx];
            virus.position = border.random_position(&mut world.rng, virus.radius);
            pops += 1;
        }
    }
    pops
}

/// Split a cell into `clamp(floor(area / 2000), 8, 16)` equal-area fragments
/// fanned out evenly around its center.
pub fn explode(
    cell: &PlayerCell,
    config: &Config,
    border: &WorldBorder,
    ids: &mut NodeIds,
    rng: &mut impl Rng,
) -> Vec<PlayerCell> {
    let total = cell.area();
    let pieces = ((total / EXPLOSION_AREA_PER_PIECE).floor() as usize)
        .clamp(EXPLOSION_MIN_PIECES, EXPLOSION_MAX_PIECES);
    let piece_radius = radius_for_area(total / pieces as f32);
    let merge_timer = config.player.merge_time * EXPLOSION_MERGE_MULT;

    (0..pieces)
        .map(|i| {
            let angle = TAU * i as f32 / pieces as f32;
            let outward = Vec2::new(angle.cos(), angle.sin());
            let distance = rng.random_range(0.8..=1.2) * 3.0 * piece_radius;
            let position = border.clamp_circle(cell.position + outward * distance, piece_radius);

            let mut fragment = PlayerCell::new(ids.next_id(), position, piece_radius);
            fragment.velocity = outward * EXPLOSION_SPEED;
            fragment.merge_timer = merge_timer;
            fragment
        })
        .collect()
}

/// Overlapping sibling cells whose merge timers expired merge by area into
/// the lower-indexed cell. Returns the number of merges.
pub fn merge_cells(world: &mut World) -> usize {
    let border = world.border;
    let mut merges = 0;
    for player in world.players.values_mut() {
        if player.cells.len() < 2 {
            continue;
        }
        let mut i = 0;
        while i < player.cells.len() {
            let mut j = i + 1;
            while j < player.cells.len() {
                let (a, b) = (&player.cells[i], &player.cells[j]);
                if !a.can_merge() || !b.can_merge() || !a.overlaps(b.position, b.radius) {
                    j += 1;
                    continue;
                }
                // j now holds the next candidate, so it is not advanced.
                let absorbed = player.cells.remove(j);
                let cell = &mut player.cells[i];
                cell.absorb(absorbed.area());
                cell.position = border.clamp_circle(cell.position, cell.radius);
                merges += 1;
            }
            i += 1;
        }
    }
    merges
}
