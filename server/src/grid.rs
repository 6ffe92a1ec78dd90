//! Tile grid owned by the game state.
//!
//! The grid is a fixed `height x width` array of [`Tile`]s stored row-major.
//! Coordinates outside the array are never stored: reads return
//! [`Tile::Wall`] so the border behaves as impassable, writes are dropped.

use shared::{
    Direction, PlayerId, GLYPH_EMPTY, GLYPH_ENEMY, GLYPH_LAVA, GLYPH_STAR, GLYPH_STAR_TRACE,
    GLYPH_TRAP, GLYPH_WALL,
};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tile {
    Wall,
    Empty,
    Star,
    /// A star disabled by a trap; stepping on it or lava turns it back.
    StarTrace,
    Trap,
    Enemy,
    Lava,
    Player(PlayerId),
}

impl Tile {
    pub fn glyph(self) -> char {
        match self {
            Tile::Wall => GLYPH_WALL,
            Tile::Empty => GLYPH_EMPTY,
            Tile::Star => GLYPH_STAR,
            Tile::StarTrace => GLYPH_STAR_TRACE,
            Tile::Trap => GLYPH_TRAP,
            Tile::Enemy => GLYPH_ENEMY,
            Tile::Lava => GLYPH_LAVA,
            Tile::Player(id) => id.symbol(),
        }
    }

    /// Parses a map-file glyph. Player letters are not valid map content.
    pub fn from_glyph(glyph: char) -> Option<Tile> {
        match glyph {
            GLYPH_WALL => Some(Tile::Wall),
            GLYPH_EMPTY => Some(Tile::Empty),
            GLYPH_STAR => Some(Tile::Star),
            GLYPH_STAR_TRACE => Some(Tile::StarTrace),
            GLYPH_TRAP => Some(Tile::Trap),
            GLYPH_ENEMY => Some(Tile::Enemy),
            GLYPH_LAVA => Some(Tile::Lava),
            _ => None,
        }
    }
}

/// Grid coordinate; `x` is the column and `y` the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn step(self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        Self::new(self.x + dx, self.y + dy)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("map has no rows")]
    Empty,
    #[error("map row {row} has {found} columns, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("unknown glyph {glyph:?} at ({x}, {y})")]
    UnknownGlyph { glyph: char, x: usize, y: usize },
}

#[derive(Debug, Clone)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<Tile>,
    /// Every cell that held a star when the grid was built. Never mutated.
    original_stars: Vec<Position>,
}

impl Grid {
    /// Builds a grid from map text, one string per row.
    pub fn from_lines<S: AsRef<str>>(lines: &[S]) -> Result<Self, GridError> {
        let width = lines
            .first()
            .map(|row| row.as_ref().chars().count())
            .ok_or(GridError::Empty)?;
        if width == 0 {
            return Err(GridError::Empty);
        }

        let mut cells = Vec::with_capacity(width * lines.len());
        for (y, row) in lines.iter().enumerate() {
            let row = row.as_ref();
            let found = row.chars().count();
            if found != width {
                return Err(GridError::Ragged {
                    row: y,
                    expected: width,
                    found,
                });
            }
            for (x, glyph) in row.chars().enumerate() {
                let tile = Tile::from_glyph(glyph).ok_or(GridError::UnknownGlyph { glyph, x, y })?;
                cells.push(tile);
            }
        }

        let mut grid = Self {
            width,
            height: lines.len(),
            cells,
            original_stars: Vec::new(),
        };
        grid.original_stars = grid.find_all(Tile::Star);
        Ok(grid)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn in_bounds(&self, pos: Position) -> bool {
        self.index(pos).is_some()
    }

    fn index(&self, pos: Position) -> Option<usize> {
        let x = usize::try_from(pos.x).ok()?;
        let y = usize::try_from(pos.y).ok()?;
        (x < self.width && y < self.height).then(|| y * self.width + x)
    }

    fn position_of(&self, index: usize) -> Position {
        Position::new((index % self.width) as i32, (index / self.width) as i32)
    }

    /// Out-of-bounds reads are walls.
    pub fn tile_at(&self, pos: Position) -> Tile {
        self.index(pos)
            .map(|index| self.cells[index])
            .unwrap_or(Tile::Wall)
    }

    /// Out-of-bounds writes are ignored.
    pub fn set_tile(&mut self, pos: Position, tile: Tile) {
        if let Some(index) = self.index(pos) {
            self.cells[index] = tile;
        }
    }

    /// All cells holding `tile`, in row-major order.
    pub fn find_all(&self, tile: Tile) -> Vec<Position> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| **cell == tile)
            .map(|(index, _)| self.position_of(index))
            .collect()
    }

    pub fn count(&self, tile: Tile) -> usize {
        self.cells.iter().filter(|cell| **cell == tile).count()
    }

    pub fn first_empty(&self) -> Option<Position> {
        self.cells
            .iter()
            .position(|cell| *cell == Tile::Empty)
            .map(|index| self.position_of(index))
    }

    pub fn original_star_positions(&self) -> &[Position] {
        &self.original_stars
    }

    /// Wire representation: one string per row, one glyph per cell.
    pub fn as_lines(&self) -> Vec<String> {
        self.cells
            .chunks(self.width)
            .map(|row| row.iter().map(|tile| tile.glyph()).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&str]) -> Grid {
        Grid::from_lines(rows).unwrap()
    }

    #[test]
    fn test_grid_construction() {
        let g = grid(&["#####", "#.*^#", "#####"]);
        assert_eq!(g.width(), 5);
        assert_eq!(g.height(), 3);
        assert_eq!(g.tile_at(Position::new(2, 1)), Tile::Star);
        assert_eq!(g.tile_at(Position::new(3, 1)), Tile::Trap);
        assert_eq!(g.original_star_positions(), &[Position::new(2, 1)]);
    }

    #[test]
    fn test_rejects_empty_map() {
        let rows: [&str; 0] = [];
        assert_eq!(Grid::from_lines(&rows).unwrap_err(), GridError::Empty);
        assert_eq!(Grid::from_lines(&[""]).unwrap_err(), GridError::Empty);
    }

    #[test]
    fn test_rejects_ragged_map() {
        let err = Grid::from_lines(&["###", "#.", "###"]).unwrap_err();
        assert_eq!(
            err,
            GridError::Ragged {
                row: 1,
                expected: 3,
                found: 2
            }
        );
    }

    #[test]
    fn test_rejects_unknown_glyph() {
        let err = Grid::from_lines(&["#A#"]).unwrap_err();
        assert_eq!(
            err,
            GridError::UnknownGlyph {
                glyph: 'A',
                x: 1,
                y: 0
            }
        );
    }

    #[test]
    fn test_out_of_bounds_reads_are_walls() {
        let g = grid(&["..", ".."]);
        assert_eq!(g.tile_at(Position::new(-1, 0)), Tile::Wall);
        assert_eq!(g.tile_at(Position::new(0, -1)), Tile::Wall);
        assert_eq!(g.tile_at(Position::new(2, 0)), Tile::Wall);
        assert_eq!(g.tile_at(Position::new(0, 2)), Tile::Wall);
        assert_eq!(g.tile_at(Position::new(1, 1)), Tile::Empty);
    }

    #[test]
    fn test_out_of_bounds_writes_are_ignored() {
        let mut g = grid(&["..", ".."]);
        let before = g.as_lines();
        g.set_tile(Position::new(5, 5), Tile::Star);
        g.set_tile(Position::new(-1, 1), Tile::Star);
        assert_eq!(g.as_lines(), before);
    }

    #[test]
    fn test_find_all_is_row_major() {
        let g = grid(&["*.*", "..*"]);
        assert_eq!(
            g.find_all(Tile::Star),
            vec![Position::new(0, 0), Position::new(2, 0), Position::new(2, 1)]
        );
        assert_eq!(g.count(Tile::Empty), 3);
        assert_eq!(g.first_empty(), Some(Position::new(1, 0)));
    }

    #[test]
    fn test_original_stars_survive_mutation() {
        let mut g = grid(&["*.*"]);
        g.set_tile(Position::new(0, 0), Tile::Empty);
        g.set_tile(Position::new(1, 0), Tile::Star);
        assert_eq!(
            g.original_star_positions(),
            &[Position::new(0, 0), Position::new(2, 0)]
        );
    }

    #[test]
    fn test_as_lines_renders_players() {
        let mut g = grid(&["#..#"]);
        g.set_tile(
            Position::new(1, 0),
            Tile::Player(PlayerId::from_symbol('C').unwrap()),
        );
        assert_eq!(g.as_lines(), vec!["#C.#".to_string()]);
    }

    #[test]
    fn test_position_step() {
        let p = Position::new(3, 3);
        assert_eq!(p.step(Direction::Up), Position::new(3, 2));
        assert_eq!(p.step(Direction::Down), Position::new(3, 4));
        assert_eq!(p.step(Direction::Left), Position::new(2, 3));
        assert_eq!(p.step(Direction::Right), Position::new(4, 3));
    }
}
