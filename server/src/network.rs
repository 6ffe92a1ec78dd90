//! Server network layer handling TCP sessions and the broadcast tick
//!
//! Each accepted connection gets its own reader task and writer task. The
//! reader decodes lines and applies them to the shared [`World`] under its
//! lock; the writer drains a bounded channel of encoded lines onto the
//! socket. The broadcaster snapshots the world on a fixed period and pushes
//! the encoded update into every session's channel, dropping it for a
//! session whose channel is full. No task holds the lock across socket I/O.

use crate::error::ServerError;
use crate::game::GameState;
use crate::players::JoinError;
use log::{debug, error, info, warn};
use shared::framing::{decode_bytes, encode_line, DELIMITER};
use shared::{ClientMessage, Direction, PlayerId, ServerMessage, DEFAULT_PORT, DEFAULT_TICK_MS};
use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex};
use tokio::time::{interval, timeout, MissedTickBehavior};

/// Reason sent to a client whose join was refused for lack of symbols.
pub const SERVER_FULL: &str = "server full";
/// Reason sent to a client whose join was refused for lack of space.
pub const NO_FREE_CELL: &str = "no free cell";

/// Lines a session may have queued before further updates are dropped.
pub const OUTBOX_CAPACITY: usize = 32;
/// How long a closing session's writer may keep flushing.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Sending side of a session's outbound line queue.
pub type Outbox = mpsc::Sender<String>;

/// Game state plus the sessions that receive broadcasts, guarded by one lock.
pub struct World {
    pub game: GameState,
    sessions: HashMap<PlayerId, Outbox>,
}

impl World {
    pub fn new(game: GameState) -> Self {
        Self {
            game,
            sessions: HashMap::new(),
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

pub type SharedWorld = Arc<Mutex<World>>;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind, `host:port`
    pub address: String,
    /// Period of the broadcast tick
    pub tick_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: format!("0.0.0.0:{}", DEFAULT_PORT),
            tick_interval: Duration::from_millis(DEFAULT_TICK_MS),
        }
    }
}

/// Authoritative game server: accept loop plus broadcast tick
pub struct Server {
    listener: TcpListener,
    world: SharedWorld,
    tick_interval: Duration,
}

impl Server {
    pub async fn bind(config: &ServerConfig, game: GameState) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(&config.address).await?;
        info!("Server listening on {}", listener.local_addr()?);

        Ok(Server {
            listener,
            world: Arc::new(Mutex::new(World::new(game))),
            tick_interval: config.tick_interval,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn world(&self) -> SharedWorld {
        Arc::clone(&self.world)
    }

    /// Runs until the future is dropped.
    pub async fn run(self) -> Result<(), ServerError> {
        info!("Server started successfully");
        tokio::select! {
            _ = run_broadcaster(Arc::clone(&self.world), self.tick_interval) => Ok(()),
            result = accept_loop(&self.listener, &self.world) => result,
        }
    }
}

async fn accept_loop(listener: &TcpListener, world: &SharedWorld) -> Result<(), ServerError> {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                info!("Accepted connection from {}", addr);
                let world = Arc::clone(world);
                tokio::spawn(handle_connection(stream, addr, world));
            }
            Err(e) => {
                error!("Error accepting connection: {}", e);
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }
    }
}

/// Per-connection state owned by the reader task
struct Session {
    addr: SocketAddr,
    player: Option<PlayerId>,
    outbox: Outbox,
}

/// Serves one connection until it closes, then releases its player.
async fn handle_connection(stream: TcpStream, addr: SocketAddr, world: SharedWorld) {
    let (reader, writer) = stream.into_split();
    let (outbox, inbox) = mpsc::channel(OUTBOX_CAPACITY);
    let mut writer_task = tokio::spawn(write_lines(writer, inbox, addr));

    let mut session = Session {
        addr,
        player: None,
        outbox,
    };

    match read_lines(reader, &mut session, &world).await {
        Ok(()) => info!("[{}] disconnected", addr),
        Err(e) => warn!("[{}] connection dropped: {}", addr, e),
    }

    if let Some(id) = session.player.take() {
        let mut world = world.lock().await;
        world.sessions.remove(&id);
        world.game.remove_player(id);
    }

    // Closing the last sender lets the writer flush and exit.
    drop(session);
    match timeout(WRITER_DRAIN_TIMEOUT, &mut writer_task).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("[{}] writer task panicked: {}", addr, e),
        Err(_) => {
            warn!("[{}] peer stopped reading, abandoning queued lines", addr);
            writer_task.abort();
        }
    }
    debug!("[{}] connection closed", addr);
}

async fn read_lines(
    reader: OwnedReadHalf,
    session: &mut Session,
    world: &SharedWorld,
) -> Result<(), ServerError> {
    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();

    loop {
        line.clear();
        if reader.read_until(DELIMITER as u8, &mut line).await? == 0 {
            return Ok(());
        }
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        match handle_line(&line, session, world).await {
            Ok(()) => {}
            Err(err @ (ServerError::Protocol(_) | ServerError::Join(_))) => {
                warn!("[{}] {}", session.addr, err);
            }
            Err(err) => return Err(err),
        }
    }
}

async fn handle_line(
    line: &[u8],
    session: &mut Session,
    world: &SharedWorld,
) -> Result<(), ServerError> {
    let message: ClientMessage = decode_bytes(line)?;
    debug!("[{}] received {:?}", session.addr, message);

    match message {
        ClientMessage::Join { name } => join(session, name.as_deref(), world).await,
        ClientMessage::Move { dir } => {
            let Some(id) = session.player else {
                debug!("[{}] move before join ignored", session.addr);
                return Ok(());
            };
            let Some(direction) = Direction::parse(&dir) else {
                debug!("[{}] unrecognized direction {:?} ignored", session.addr, dir);
                return Ok(());
            };

            let mut world = world.lock().await;
            world.game.apply_move(id, direction);
            Ok(())
        }
    }
}

async fn join(
    session: &mut Session,
    name: Option<&str>,
    world: &SharedWorld,
) -> Result<(), ServerError> {
    if let Some(id) = session.player {
        warn!("[{}] already joined as {}, join ignored", session.addr, id);
        return Ok(());
    }

    let mut world = world.lock().await;
    let id = match world.game.add_player(name) {
        Ok(id) => id,
        Err(refused) => {
            let reason = match refused {
                JoinError::CapacityExceeded(_) => SERVER_FULL,
                JoinError::NoFreeCell { .. } => NO_FREE_CELL,
            };
            queue(
                &session.outbox,
                &ServerMessage::Error {
                    reason: reason.to_string(),
                },
            )?;
            return Err(refused.into());
        }
    };

    // Queued before the session becomes visible to the broadcaster, so the
    // init line always precedes the first update.
    let init = ServerMessage::Init {
        player_id: id,
        map: world.game.grid().as_lines(),
    };
    queue(&session.outbox, &init)?;
    world.sessions.insert(id, session.outbox.clone());
    session.player = Some(id);
    info!("[{}] joined as player {}", session.addr, id);
    Ok(())
}

/// Encodes a message into a session's outbound queue.
fn queue(outbox: &Outbox, message: &ServerMessage) -> Result<(), ServerError> {
    let line = encode_line(message)?;
    outbox.try_send(line).map_err(|err| {
        let (kind, reason) = match err {
            TrySendError::Full(_) => (io::ErrorKind::WouldBlock, "session queue full"),
            TrySendError::Closed(_) => (io::ErrorKind::BrokenPipe, "session writer closed"),
        };
        ServerError::Transport(io::Error::new(kind, reason))
    })
}

async fn write_lines(
    mut writer: OwnedWriteHalf,
    mut inbox: mpsc::Receiver<String>,
    addr: SocketAddr,
) {
    while let Some(line) = inbox.recv().await {
        if let Err(e) = writer.write_all(line.as_bytes()).await {
            warn!("[{}] write failed: {}", addr, e);
            return;
        }
    }
    let _ = writer.shutdown().await;
}

async fn run_broadcaster(world: SharedWorld, period: Duration) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    // Skip the first tick since it fires immediately
    ticker.tick().await;

    loop {
        ticker.tick().await;
        broadcast_tick(&world).await;
    }
}

/// Takes one snapshot and pushes it to every session. Returns how many
/// sessions accepted the update.
pub async fn broadcast_tick(world: &SharedWorld) -> usize {
    let (tick, snapshot, recipients) = {
        let mut world = world.lock().await;
        let snapshot = world.game.take_snapshot();
        let recipients: Vec<(PlayerId, Outbox)> = world
            .sessions
            .iter()
            .map(|(id, outbox)| (*id, outbox.clone()))
            .collect();
        (world.game.tick, snapshot, recipients)
    };

    if recipients.is_empty() {
        return 0;
    }

    if tick % 40 == 0 {
        debug!(
            "Tick {}: {} sessions, {} events",
            tick,
            recipients.len(),
            snapshot.events.len()
        );
    }

    let line = match encode_line(&ServerMessage::Update(snapshot)) {
        Ok(line) => line,
        Err(e) => {
            error!("Failed to encode update: {}", e);
            return 0;
        }
    };

    let mut delivered = 0;
    for (id, outbox) in recipients {
        match outbox.try_send(line.clone()) {
            Ok(()) => delivered += 1,
            Err(TrySendError::Full(_)) => {
                warn!("Player {} is not reading, update for tick {} dropped", id, tick)
            }
            Err(TrySendError::Closed(_)) => {
                warn!("Broadcast to player {} failed: session closed", id)
            }
        }
    }
    delivered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;
    use crate::random::SeededRandom;
    use shared::framing::decode_line;
    use shared::{GameEvent, Snapshot};
    use tokio::io::AsyncBufReadExt;
    use tokio::time::timeout;

    const ROWS: [&str; 4] = ["#######", "#.*...#", "#.....#", "#######"];

    fn world() -> SharedWorld {
        let grid = Grid::from_lines(&ROWS).unwrap();
        Arc::new(Mutex::new(World::new(GameState::new(
            grid,
            SeededRandom::new(1),
        ))))
    }

    fn decode_update(line: &str) -> Snapshot {
        match decode_line::<ServerMessage>(line).unwrap() {
            ServerMessage::Update(snapshot) => snapshot,
            other => panic!("expected update, got {:?}", other),
        }
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.address, "0.0.0.0:9009");
        assert_eq!(config.tick_interval, Duration::from_millis(250));
    }

    #[test]
    fn test_broadcast_without_runtime_driver() {
        let world = world();
        assert_eq!(tokio_test::block_on(broadcast_tick(&world)), 0);
        assert_eq!(tokio_test::block_on(broadcast_tick(&world)), 0);
        assert_eq!(tokio_test::block_on(async { world.lock().await.game.tick }), 2);
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_session() {
        let world = world();
        let (tx_a, mut rx_a) = mpsc::channel(OUTBOX_CAPACITY);
        let (tx_b, mut rx_b) = mpsc::channel(OUTBOX_CAPACITY);
        {
            let mut w = world.lock().await;
            let a = w.game.add_player(Some("ann")).unwrap();
            let b = w.game.add_player(Some("bob")).unwrap();
            w.sessions.insert(a, tx_a);
            w.sessions.insert(b, tx_b);
            w.game.apply_move(a, Direction::Right);
        }

        assert_eq!(broadcast_tick(&world).await, 2);

        let first = decode_update(&rx_a.try_recv().unwrap());
        let second = decode_update(&rx_b.try_recv().unwrap());
        assert_eq!(first, second);
        assert_eq!(first.events.len(), 1);
        assert_eq!(first.players.len(), 2);
    }

    #[tokio::test]
    async fn test_broadcast_drains_events() {
        let world = world();
        let (tx, mut rx) = mpsc::channel(OUTBOX_CAPACITY);
        let a;
        {
            let mut w = world.lock().await;
            a = w.game.add_player(None).unwrap();
            w.sessions.insert(a, tx);
            w.game.apply_move(a, Direction::Right);
        }

        broadcast_tick(&world).await;
        broadcast_tick(&world).await;

        let first = decode_update(&rx.try_recv().unwrap());
        let second = decode_update(&rx.try_recv().unwrap());
        assert_eq!(first.events, vec![GameEvent::collect(a)]);
        assert!(second.events.is_empty());
        assert!(world.lock().await.game.pending_events().is_empty());
    }

    #[tokio::test]
    async fn test_closed_session_does_not_block_others() {
        let world = world();
        let (tx_a, rx_a) = mpsc::channel(OUTBOX_CAPACITY);
        let (tx_b, mut rx_b) = mpsc::channel(OUTBOX_CAPACITY);
        {
            let mut w = world.lock().await;
            let a = w.game.add_player(None).unwrap();
            let b = w.game.add_player(None).unwrap();
            w.sessions.insert(a, tx_a);
            w.sessions.insert(b, tx_b);
        }
        drop(rx_a);

        assert_eq!(broadcast_tick(&world).await, 1);
        assert!(rx_b.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_full_outbox_drops_update_and_stays_bounded() {
        let world = world();
        let (tx_a, mut rx_a) = mpsc::channel(1);
        let (tx_b, mut rx_b) = mpsc::channel(OUTBOX_CAPACITY);
        {
            let mut w = world.lock().await;
            let a = w.game.add_player(None).unwrap();
            let b = w.game.add_player(None).unwrap();
            w.sessions.insert(a, tx_a.clone());
            w.sessions.insert(b, tx_b);
        }
        tx_a.try_send("stale\n".to_string()).unwrap();

        for _ in 0..5 {
            assert_eq!(broadcast_tick(&world).await, 1);
        }

        assert_eq!(rx_a.try_recv().unwrap(), "stale\n");
        assert!(rx_a.try_recv().is_err());
        for _ in 0..5 {
            assert!(rx_b.try_recv().is_ok());
        }
        assert_eq!(world.lock().await.session_count(), 2);
    }

    #[tokio::test]
    async fn test_tick_without_sessions_still_drains() {
        let world = world();
        {
            let mut w = world.lock().await;
            let a = w.game.add_player(None).unwrap();
            w.game.apply_move(a, Direction::Right);
        }
        assert_eq!(broadcast_tick(&world).await, 0);
        assert!(world.lock().await.game.pending_events().is_empty());
    }

    #[tokio::test]
    async fn test_connection_lifecycle() {
        let config = ServerConfig {
            address: "127.0.0.1:0".to_string(),
            tick_interval: Duration::from_millis(20),
        };
        let grid = Grid::from_lines(&ROWS).unwrap();
        let server = Server::bind(&config, GameState::new(grid, SeededRandom::new(2)))
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();
        let world = server.world();
        let handle = tokio::spawn(server.run());

        let stream = TcpStream::connect(addr).await.unwrap();
        let (reader, mut writer) = stream.into_split();
        let mut lines = BufReader::new(reader).lines();

        writer
            .write_all(b"garbage that is not json\n{\"type\":\"join\",\"payload\":{\"name\":\"ann\"}}\n")
            .await
            .unwrap();

        let init = timeout(Duration::from_secs(2), lines.next_line())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        match decode_line::<ServerMessage>(&init).unwrap() {
            ServerMessage::Init { player_id, map } => {
                assert_eq!(player_id.symbol(), 'A');
                assert_eq!(map[1], "#A*...#");
            }
            other => panic!("expected init, got {:?}", other),
        }
        assert_eq!(world.lock().await.session_count(), 1);

        drop(writer);
        drop(lines);

        timeout(Duration::from_secs(2), async {
            loop {
                if world.lock().await.game.players().is_empty() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        let w = world.lock().await;
        assert_eq!(w.session_count(), 0);
        assert_eq!(w.game.grid().as_lines()[1], "#.*...#");
        drop(w);
        handle.abort();
    }
}
