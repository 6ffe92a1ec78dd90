//! Wire vocabulary shared by the star-grid server and its clients.
//!
//! Every message travels as one JSON object per line:
//! `{"type": <string>, "payload": <object>}` followed by `\n`.
//! The [`framing`] module turns those lines into typed messages and back.

pub mod framing;

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const DEFAULT_PORT: u16 = 9009;
pub const DEFAULT_TICK_MS: u64 = 250;

pub const GLYPH_EMPTY: char = '.';
pub const GLYPH_WALL: char = '#';
pub const GLYPH_STAR: char = '*';
pub const GLYPH_STAR_TRACE: char = '@';
pub const GLYPH_TRAP: char = '^';
pub const GLYPH_LAVA: char = '~';
pub const GLYPH_ENEMY: char = '&';

/// Symbols handed out to players, in assignment order.
pub const FIRST_PLAYER_SYMBOL: char = 'A';
pub const LAST_PLAYER_SYMBOL: char = 'Z';
pub const PLAYER_SYMBOL_COUNT: usize = 26;

/// Identifier of a connected player; rendered on the map as its own letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(char);

impl PlayerId {
    pub fn from_symbol(symbol: char) -> Option<Self> {
        (FIRST_PLAYER_SYMBOL..=LAST_PLAYER_SYMBOL)
            .contains(&symbol)
            .then_some(Self(symbol))
    }

    pub fn symbol(self) -> char {
        self.0
    }

    /// The full alphabet in lexicographic order.
    pub fn all() -> impl Iterator<Item = PlayerId> {
        (FIRST_PLAYER_SYMBOL..=LAST_PLAYER_SYMBOL).map(PlayerId)
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for PlayerId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut buf = [0u8; 4];
        serializer.serialize_str(self.0.encode_utf8(&mut buf))
    }
}

impl<'de> Deserialize<'de> for PlayerId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let mut chars = raw.chars();
        match (chars.next(), chars.next()) {
            (Some(symbol), None) => PlayerId::from_symbol(symbol)
                .ok_or_else(|| de::Error::custom(format!("invalid player symbol {:?}", raw))),
            _ => Err(de::Error::custom(format!(
                "player id must be a single letter, got {:?}",
                raw
            ))),
        }
    }
}

/// One of the four unit moves on the grid. `x` grows to the right, `y` grows downward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Left,
        Direction::Down,
        Direction::Right,
    ];

    /// Accepts the WASD keys and their spelled-out equivalents, ignoring case.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "w" | "up" => Some(Direction::Up),
            "s" | "down" => Some(Direction::Down),
            "a" | "left" => Some(Direction::Left),
            "d" | "right" => Some(Direction::Right),
            _ => None,
        }
    }

    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    /// The key a client sends for this direction.
    pub fn key(self) -> &'static str {
        match self {
            Direction::Up => "w",
            Direction::Down => "s",
            Direction::Left => "a",
            Direction::Right => "d",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ClientMessage {
    Join {
        #[serde(default)]
        name: Option<String>,
    },
    /// `dir` stays a raw string so that unknown directions can be ignored
    /// instead of failing the whole line.
    Move { dir: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerMessage {
    Init {
        player_id: PlayerId,
        map: Vec<String>,
    },
    Update(Snapshot),
    Error {
        reason: String,
    },
}

/// Consistent view of the world taken once per broadcast tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub map: Vec<String>,
    pub players: BTreeMap<PlayerId, PlayerSummary>,
    pub events: Vec<GameEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<PlayerId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub score: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    Collect,
    RestoreTrace,
    HitTrap,
    HitEnemy,
    HitLava,
    Win,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventDetail {
    Converted { converted: usize },
    Added { added: usize },
    Restored { restored: usize },
}

/// Side effect of a move, reported to every client in the next update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEvent {
    pub player: PlayerId,
    pub action: EventAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<EventDetail>,
}

impl GameEvent {
    pub fn collect(player: PlayerId) -> Self {
        Self::plain(player, EventAction::Collect)
    }

    pub fn restore_trace(player: PlayerId) -> Self {
        Self::plain(player, EventAction::RestoreTrace)
    }

    pub fn hit_trap(player: PlayerId, converted: usize) -> Self {
        Self {
            player,
            action: EventAction::HitTrap,
            detail: Some(EventDetail::Converted { converted }),
        }
    }

    pub fn hit_enemy(player: PlayerId, added: usize) -> Self {
        Self {
            player,
            action: EventAction::HitEnemy,
            detail: Some(EventDetail::Added { added }),
        }
    }

    pub fn hit_lava(player: PlayerId, restored: usize) -> Self {
        Self {
            player,
            action: EventAction::HitLava,
            detail: Some(EventDetail::Restored { restored }),
        }
    }

    pub fn win(player: PlayerId) -> Self {
        Self::plain(player, EventAction::Win)
    }

    fn plain(player: PlayerId, action: EventAction) -> Self {
        Self {
            player,
            action,
            detail: None,
        }
    }
}
