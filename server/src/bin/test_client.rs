use clap::Parser;
use log::{debug, info, warn};
use server::random::{RandomSource, SeededRandom};
use shared::framing::{decode_line, encode_line};
use shared::{ClientMessage, Direction, PlayerId, ServerMessage, DEFAULT_PORT};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

/// Headless client: joins, then sends one move per received update.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short, long, default_value_t = format!("127.0.0.1:{}", DEFAULT_PORT))]
    server: String,

    /// Display name sent with the join request
    #[arg(short, long, default_value = "bot")]
    name: String,

    /// Scripted moves as WASD keys, e.g. "ddsaw"; random when omitted
    #[arg(short, long)]
    moves: Option<String>,

    /// Number of random moves when no script is given
    #[arg(long, default_value_t = 20)]
    steps: usize,

    /// Seed for random moves
    #[arg(long, default_value_t = 1)]
    seed: u64,
}

fn plan(args: &Args) -> Vec<Direction> {
    match &args.moves {
        Some(script) => script
            .chars()
            .filter_map(|key| Direction::parse(&key.to_string()))
            .collect(),
        None => {
            let mut rng = SeededRandom::new(args.seed);
            (0..args.steps)
                .filter_map(|_| rng.pick_one(&Direction::ALL[..]).copied())
                .collect()
        }
    }
}

fn print_map(map: &[String]) {
    println!("{}", "=".repeat(20));
    for row in map {
        println!("{}", row);
    }
    println!("{}", "=".repeat(20));
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut moves = plan(&args).into_iter();

    info!("Connecting to server at {}...", args.server);
    let stream = TcpStream::connect(&args.server).await?;
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    let join = ClientMessage::Join {
        name: Some(args.name.clone()),
    };
    writer.write_all(encode_line(&join)?.as_bytes()).await?;

    let mut player_id: Option<PlayerId> = None;
    while let Some(line) = lines.next_line().await? {
        let message = match decode_line::<ServerMessage>(&line) {
            Ok(message) => message,
            Err(e) => {
                warn!("Skipping unparsable line: {}", e);
                continue;
            }
        };

        match message {
            ServerMessage::Init { player_id: id, map } => {
                info!("Joined as player {}", id);
                player_id = Some(id);
                print_map(&map);
            }
            ServerMessage::Error { reason } => {
                warn!("Server refused: {}", reason);
                break;
            }
            ServerMessage::Update(snapshot) => {
                print_map(&snapshot.map);
                for event in &snapshot.events {
                    debug!("Event: {:?}", event);
                }
                if let Some(id) = player_id {
                    let score = snapshot.players.get(&id).map(|p| p.score).unwrap_or(0);
                    info!("Your ID: {} | Score: {}", id, score);
                }
                if let Some(winner) = snapshot.winner {
                    info!("Player {} has won", winner);
                }

                let Some(direction) = moves.next() else {
                    info!("Script finished");
                    break;
                };
                let step = ClientMessage::Move {
                    dir: direction.key().to_string(),
                };
                writer.write_all(encode_line(&step)?.as_bytes()).await?;
            }
        }
    }

    writer.shutdown().await?;
    info!("Client shutdown.");
    Ok(())
}
