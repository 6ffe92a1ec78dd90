//! Player registry for the game server
//!
//! This module tracks the players currently in the game:
//! - Identifier assignment from the fixed symbol alphabet
//! - Spawn point selection on the grid
//! - Lookup, insertion and removal by identifier
//!
//! An identifier is only handed out again once its previous owner has been
//! removed, so at most one live player exists per symbol.

use crate::grid::{Grid, Position};
use log::info;
use shared::{PlayerId, PLAYER_SYMBOL_COUNT};
use std::collections::BTreeMap;
use thiserror::Error;

/// Fallback spawn when the grid has no empty cell left.
pub const FALLBACK_SPAWN: Position = Position::new(1, 1);

/// A player avatar on the grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    /// Symbol drawn on the map for this player
    pub id: PlayerId,
    /// Display name sent with the join request
    pub name: String,
    /// Current cell on the grid
    pub position: Position,
    /// Stars collected so far
    pub score: u32,
}

impl Player {
    /// Creates a new player with a zero score
    pub fn new(id: PlayerId, name: impl Into<String>, position: Position) -> Self {
        Self {
            id,
            name: name.into(),
            position,
            score: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("server full: all {capacity} player symbols are in use")]
pub struct CapacityExceeded {
    pub capacity: usize,
}

/// Why a join was refused. The connection stays open either way.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum JoinError {
    #[error(transparent)]
    CapacityExceeded(#[from] CapacityExceeded),
    /// Every cell is taken and the fallback spawn is not empty.
    #[error("no free cell to spawn on: ({x}, {y}) is occupied")]
    NoFreeCell { x: i32, y: i32 },
}

/// Owns every live player, keyed by identifier
///
/// The registry bounds the player count to the size of the symbol alphabet
/// (or a smaller configured capacity). Identifiers are always assigned
/// smallest-first so a freed symbol is the next one reused.
#[derive(Debug)]
pub struct PlayerRegistry {
    /// Live players indexed by their identifier
    players: BTreeMap<PlayerId, Player>,
    /// Number of symbols from the alphabet that may be in use at once
    capacity: usize,
}

impl Default for PlayerRegistry {
    fn default() -> Self {
        Self::new(PLAYER_SYMBOL_COUNT)
    }
}

impl PlayerRegistry {
    /// Creates an empty registry; capacity is clamped to the alphabet size
    pub fn new(capacity: usize) -> Self {
        Self {
            players: BTreeMap::new(),
            capacity: capacity.min(PLAYER_SYMBOL_COUNT),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Picks the lexicographically smallest unused symbol
    pub fn assign_identifier(&self) -> Result<PlayerId, CapacityExceeded> {
        PlayerId::all()
            .take(self.capacity)
            .find(|id| !self.players.contains_key(id))
            .ok_or(CapacityExceeded {
                capacity: self.capacity,
            })
    }

    /// First empty cell in row-major order, or [`FALLBACK_SPAWN`]
    pub fn spawn_position(grid: &Grid) -> Position {
        grid.first_empty().unwrap_or(FALLBACK_SPAWN)
    }

    /// Registers a player, replacing any stale entry with the same identifier
    pub fn add(&mut self, player: Player) {
        info!(
            "Player {} ({}) added at ({}, {})",
            player.id, player.name, player.position.x, player.position.y
        );
        self.players.insert(player.id, player);
    }

    /// Removes a player, returning it if it was registered
    pub fn remove(&mut self, id: PlayerId) -> Option<Player> {
        let removed = self.players.remove(&id);
        if removed.is_some() {
            info!("Player {} removed", id);
        }
        removed
    }

    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn get_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    /// Players in identifier order
    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    /// Returns the number of live players
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Returns true if nobody is playing
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}
