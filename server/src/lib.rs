//! # Star Grid Server Library
//!
//! This library provides the authoritative server for the star-grid
//! multiplayer game. Clients connect over TCP, each steering one avatar on a
//! shared tile grid, and the server owns the only true copy of the map and
//! the scores, pushing consistent snapshots to everybody on a fixed tick.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative State
//! The grid, the player table and the pending event buffer live in a single
//! [`game::GameState`]. Every mutation happens inside one lock, so two moves
//! never interleave their effects.
//!
//! ### Move Resolution
//! A move request is resolved against the tile the player tries to enter:
//! stars score, traces restore, traps corrupt stars, enemies spawn stars and
//! lava puts the original stars back. Walls and the map border silently
//! block the move.
//!
//! ### State Broadcasting
//! On every tick the server snapshots the grid, scores and the events
//! produced since the previous tick, clears the events, and sends the
//! snapshot to every joined client.
//!
//! ## Module Organization
//!
//! - `grid`: tile storage, bounds-checked access and the wire rendering
//! - `players`: identifier assignment, spawn selection and player lookup
//! - `resolver`: the per-move tile state machine
//! - `win`: the 80% win rule
//! - `game`: the aggregate state shared by sessions and the broadcaster
//! - `network`: TCP sessions, the accept loop and the broadcast tick
//! - `map_loader`: level files on disk
//! - `random`: seedable random picks for tile effects
//! - `error`: the server error taxonomy
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::game::GameState;
//! use server::grid::Grid;
//! use server::network::{Server, ServerConfig};
//! use server::random::SeededRandom;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let rows = server::map_loader::load_map("maps", 1)?;
//!     let game = GameState::new(Grid::from_lines(&rows)?, SeededRandom::new(7));
//!
//!     let server = Server::bind(&ServerConfig::default(), game).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod game;
pub mod grid;
pub mod map_loader;
pub mod network;
pub mod players;
pub mod random;
pub mod resolver;
pub mod win;
