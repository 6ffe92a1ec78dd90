//! Move resolution: interprets the tile a player tries to enter.
//!
//! Resolution is total over its inputs. Walls, the map border and other
//! players block the move without touching any state; every other tile
//! applies its effect and, except for a star trace, lets the player advance.

use crate::grid::{Grid, Position, Tile};
use crate::players::Player;
use crate::random::RandomSource;
use clap::ValueEnum;
use log::debug;
use shared::{Direction, GameEvent};

/// Stars turned into traces by a trap.
pub const TRAP_CONVERSIONS: usize = 3;
/// Empty cells turned into stars by an enemy.
pub const ENEMY_SPAWNS: usize = 5;

/// How far a single move request carries the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum MoveMode {
    /// One cell per request.
    #[default]
    Step,
    /// Keep stepping over empty cells until something stops the player.
    Slide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Wall, border or another player: nothing changed.
    Blocked,
    /// The trace in front of the player became a star; the player stayed put.
    RestoredTrace,
    /// The player entered a cell that held the given tile.
    Advanced(Tile),
}

/// Resolves a move according to `mode`.
pub fn resolve<R: RandomSource>(
    grid: &mut Grid,
    player: &mut Player,
    direction: Direction,
    mode: MoveMode,
    rng: &mut R,
    events: &mut Vec<GameEvent>,
) -> MoveOutcome {
    match mode {
        MoveMode::Step => resolve_step(grid, player, direction, rng, events),
        MoveMode::Slide => {
            let mut outcome = MoveOutcome::Blocked;
            loop {
                match resolve_step(grid, player, direction, rng, events) {
                    step @ MoveOutcome::Advanced(Tile::Empty) => outcome = step,
                    MoveOutcome::Blocked => return outcome,
                    step => return step,
                }
            }
        }
    }
}

/// Resolves a single-cell move.
pub fn resolve_step<R: RandomSource>(
    grid: &mut Grid,
    player: &mut Player,
    direction: Direction,
    rng: &mut R,
    events: &mut Vec<GameEvent>,
) -> MoveOutcome {
    let target = player.position.step(direction);
    if !grid.in_bounds(target) {
        return MoveOutcome::Blocked;
    }
    let tile = grid.tile_at(target);

    match tile {
        Tile::Wall | Tile::Player(_) => return MoveOutcome::Blocked,
        Tile::StarTrace => {
            grid.set_tile(target, Tile::Star);
            events.push(GameEvent::restore_trace(player.id));
            return MoveOutcome::RestoredTrace;
        }
        Tile::Star => {
            player.score += 1;
            grid.set_tile(target, Tile::Empty);
            events.push(GameEvent::collect(player.id));
        }
        Tile::Trap => {
            let converted =
                replace_random(grid, Tile::Star, Tile::StarTrace, TRAP_CONVERSIONS, rng);
            events.push(GameEvent::hit_trap(player.id, converted));
        }
        Tile::Enemy => {
            let added = replace_random(grid, Tile::Empty, Tile::Star, ENEMY_SPAWNS, rng);
            events.push(GameEvent::hit_enemy(player.id, added));
        }
        Tile::Lava => {
            let restored = restore_original_stars(grid);
            events.push(GameEvent::hit_lava(player.id, restored));
        }
        Tile::Empty => {}
    }

    advance(grid, player, target);
    debug!(
        "Player {} moved {:?} to ({}, {})",
        player.id, direction, target.x, target.y
    );
    MoveOutcome::Advanced(tile)
}

fn advance(grid: &mut Grid, player: &mut Player, target: Position) {
    grid.set_tile(player.position, Tile::Empty);
    grid.set_tile(target, Tile::Player(player.id));
    player.position = target;
}

/// Turns up to `limit` random `from` cells into `to`; returns how many changed.
fn replace_random<R: RandomSource>(
    grid: &mut Grid,
    from: Tile,
    to: Tile,
    limit: usize,
    rng: &mut R,
) -> usize {
    let candidates = grid.find_all(from);
    let chosen = rng.pick_k_unique(&candidates, limit);
    for pos in &chosen {
        grid.set_tile(*pos, to);
    }
    chosen.len()
}

/// Puts a star back on every original star cell that is currently empty.
fn restore_original_stars(grid: &mut Grid) -> usize {
    let emptied: Vec<Position> = grid
        .original_star_positions()
        .iter()
        .copied()
        .filter(|pos| grid.tile_at(*pos) == Tile::Empty)
        .collect();
    for pos in &emptied {
        grid.set_tile(*pos, Tile::Star);
    }
    emptied.len()
}
