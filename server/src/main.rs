use clap::Parser;
use log::{error, info};
use server::error::ServerError;
use server::game::GameState;
use server::grid::Grid;
use server::map_loader;
use server::network::{Server, ServerConfig};
use server::random::SeededRandom;
use server::resolver::MoveMode;
use shared::{DEFAULT_PORT, DEFAULT_TICK_MS, PLAYER_SYMBOL_COUNT};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Level number to load from the maps directory
    #[arg(short, long, default_value_t = 1)]
    level: u32,

    /// Directory holding level_<n>.map files
    #[arg(long, default_value = "maps")]
    maps_dir: PathBuf,

    /// Broadcast period in milliseconds
    #[arg(short, long, default_value_t = DEFAULT_TICK_MS)]
    tick_ms: u64,

    /// Seed for tile effects; taken from the clock when omitted
    #[arg(long)]
    seed: Option<u64>,

    /// Movement rule for a single move request
    #[arg(long, value_enum, default_value_t = MoveMode::Step)]
    move_mode: MoveMode,

    /// Maximum number of simultaneous players
    #[arg(long, default_value_t = PLAYER_SYMBOL_COUNT)]
    max_players: usize,
}

fn load_level(args: &Args) -> Result<Grid, ServerError> {
    let rows = map_loader::load_map(&args.maps_dir, args.level)?;
    let grid = Grid::from_lines(&rows)?;
    info!(
        "Loaded level {} ({}x{}, {} stars)",
        args.level,
        grid.width(),
        grid.height(),
        grid.original_star_positions().len()
    );
    Ok(grid)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let grid = match load_level(&args) {
        Ok(grid) => grid,
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    };

    let rng = args
        .seed
        .map(SeededRandom::new)
        .unwrap_or_else(SeededRandom::from_clock);
    info!("Random seed {}, move mode {:?}", rng.seed(), args.move_mode);

    let game = GameState::new(grid, rng)
        .with_move_mode(args.move_mode)
        .with_max_players(args.max_players);

    let config = ServerConfig {
        address: format!("{}:{}", args.host, args.port),
        tick_interval: Duration::from_millis(args.tick_ms.max(1)),
    };
    let server = Server::bind(&config, game).await?;

    // Handle shutdown gracefully
    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Server stopped: {}", e);
                return Err(e.into());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}
