//! Win condition.
//!
//! A player wins once its own score and the number of stars removed from the
//! board both reach 80% of the stars the map started with. The global check
//! stops a player from winning on stars that enemies added to the board.

use crate::grid::{Grid, Tile};
use crate::players::Player;
use shared::PlayerId;

/// `floor(0.8 * original stars)`, computed in integers.
pub fn required_to_win(grid: &Grid) -> usize {
    grid.original_star_positions().len() * 4 / 5
}

/// Original star count minus stars currently on the board, floored at zero.
pub fn collected_globally(grid: &Grid) -> usize {
    grid.original_star_positions()
        .len()
        .saturating_sub(grid.count(Tile::Star))
}

/// The lowest identifier that satisfies both conditions, if any.
/// A map without stars can never be won.
pub fn evaluate<'a>(
    grid: &Grid,
    players: impl IntoIterator<Item = &'a Player>,
) -> Option<PlayerId> {
    if grid.original_star_positions().is_empty() {
        return None;
    }
    let required = required_to_win(grid);
    if collected_globally(grid) < required {
        return None;
    }
    players
        .into_iter()
        .filter(|player| player.score as usize >= required)
        .map(|player| player.id)
        .min()
}
