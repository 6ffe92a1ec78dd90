//! The authoritative game aggregate shared by sessions and the broadcaster.

use crate::grid::{Grid, Tile};
use crate::players::{JoinError, Player, PlayerRegistry};
use crate::random::SeededRandom;
use crate::resolver::{self, MoveMode, MoveOutcome};
use crate::win;
use log::info;
use shared::{Direction, GameEvent, PlayerId, PlayerSummary, Snapshot, PLAYER_SYMBOL_COUNT};

/// Everything the server is authoritative for. Shared behind one lock by the
/// connection handlers and the tick broadcaster.
#[derive(Debug)]
pub struct GameState {
    pub tick: u64,
    grid: Grid,
    players: PlayerRegistry,
    pending_events: Vec<GameEvent>,
    winner: Option<PlayerId>,
    rng: SeededRandom,
    move_mode: MoveMode,
}

impl GameState {
    pub fn new(grid: Grid, rng: SeededRandom) -> Self {
        Self {
            tick: 0,
            grid,
            players: PlayerRegistry::new(PLAYER_SYMBOL_COUNT),
            pending_events: Vec::new(),
            winner: None,
            rng,
            move_mode: MoveMode::default(),
        }
    }

    pub fn with_move_mode(mut self, move_mode: MoveMode) -> Self {
        self.move_mode = move_mode;
        self
    }

    /// Limits how many players may be in the game at once.
    pub fn with_max_players(mut self, max_players: usize) -> Self {
        self.players = PlayerRegistry::new(max_players);
        self
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn players(&self) -> &PlayerRegistry {
        &self.players
    }

    pub fn pending_events(&self) -> &[GameEvent] {
        &self.pending_events
    }

    pub fn winner(&self) -> Option<PlayerId> {
        self.winner
    }

    pub fn move_mode(&self) -> MoveMode {
        self.move_mode
    }

    /// Creates a player at the spawn point and stamps its marker on the grid.
    /// A blank name falls back to the assigned symbol. The join is refused
    /// when the spawn cell is not empty, so no tile is ever overwritten.
    pub fn add_player(&mut self, name: Option<&str>) -> Result<PlayerId, JoinError> {
        let id = self.players.assign_identifier()?;
        let position = PlayerRegistry::spawn_position(&self.grid);
        if self.grid.tile_at(position) != Tile::Empty {
            return Err(JoinError::NoFreeCell {
                x: position.x,
                y: position.y,
            });
        }
        let name = match name.map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => id.to_string(),
        };

        self.grid.set_tile(position, Tile::Player(id));
        self.players.add(Player::new(id, name, position));
        Ok(id)
    }

    /// Vacates the player's cell and forgets the player.
    pub fn remove_player(&mut self, id: PlayerId) -> Option<Player> {
        let player = self.players.remove(id)?;
        if self.grid.tile_at(player.position) == Tile::Player(id) {
            self.grid.set_tile(player.position, Tile::Empty);
        }
        Some(player)
    }

    /// Applies one move request. Returns `None` for an unknown player.
    pub fn apply_move(&mut self, id: PlayerId, direction: Direction) -> Option<MoveOutcome> {
        let player = self.players.get_mut(id)?;
        let outcome = resolver::resolve(
            &mut self.grid,
            player,
            direction,
            self.move_mode,
            &mut self.rng,
            &mut self.pending_events,
        );

        if outcome != MoveOutcome::Blocked {
            self.check_winner();
        }
        Some(outcome)
    }

    fn check_winner(&mut self) {
        if self.winner.is_some() {
            return;
        }
        if let Some(winner) = win::evaluate(&self.grid, self.players.iter()) {
            info!(
                "Player {} wins with {} of {} required stars",
                winner,
                self.players.get(winner).map(|p| p.score).unwrap_or_default(),
                win::required_to_win(&self.grid)
            );
            self.winner = Some(winner);
            self.pending_events.push(GameEvent::win(winner));
        }
    }

    /// Builds the broadcast view and drains the pending events.
    pub fn take_snapshot(&mut self) -> Snapshot {
        self.tick += 1;
        Snapshot {
            map: self.grid.as_lines(),
            players: self
                .players
                .iter()
                .map(|player| {
                    (
                        player.id,
                        PlayerSummary {
                            score: player.score,
                            name: player.name.clone(),
                            x: player.position.x,
                            y: player.position.y,
                        },
                    )
                })
                .collect(),
            events: std::mem::take(&mut self.pending_events),
            winner: self.winner,
        }
    }
}
