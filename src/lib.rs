//! Authoritative server for Truco FDP.
//!
//! One process owns a fixed set of rooms. Clients connect over a
//! WebSocket, join a room, and play multi-round trick-taking games
//! until one survivor remains or the game clock runs out. All game
//! state lives here; clients render broadcast events and submit
//! intents.
//!
//! ## Architecture
//!
//! - [`cards`] — rank/suit/card model, vira-relative strength, deck
//! - [`rules`] — bid legality, play validation, trick resolution, scoring
//! - [`state`] — room/player/session/game entities and chat log
//! - [`store`] — in-memory world plus crash-safe snapshot file
//! - [`engine`] — per-room authoritative state machine
//! - [`lobby`] — join/leave/reconnect, host election, session sweeps
//! - [`timers`] — abortable scheduled tasks driving auto-actions
//! - [`events`] — wire messages, fan-out, action-sync cache
//! - [`dispatch`] — per-connection intent loop under the room lock
//! - [`server`] — actix HTTP surface and WebSocket upgrade

pub mod cards;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod events;
pub mod lobby;
pub mod rules;
pub mod server;
pub mod state;
pub mod store;
pub mod timers;

/// dimensional analysis types
pub type Lives = u8;
pub type Bid = u8;
pub type Position = usize;
pub type Millis = u64;

// room & seating parameters
pub const MAX_SEATED: usize = 10;
pub const MIN_PLAYERS_TO_START: usize = 2;
pub const NAME_MIN_CHARS: usize = 3;
pub const NAME_MAX_CHARS: usize = 20;

// session parameters
pub const SESSION_GRACE_MS: Millis = 300_000;
pub const SESSION_SWEEP_MS: Millis = 30_000;

// timer parameters
pub const TURN_TIMER_DEFAULT_SECS: u64 = 20;
pub const TURN_TIMER_MIN_SECS: u64 = 5;
pub const TURN_TIMER_MAX_SECS: u64 = 30;
pub const TRICK_DELAY_DEFAULT_MS: Millis = 10_000;
pub const ROUND_GAP_DEFAULT_MS: Millis = 200;
pub const GAME_TIME_LIMIT_MS: Millis = 3_600_000;
pub const GAME_TICK_MS: Millis = 60_000;
pub const GAME_WARNING_MS: Millis = 300_000;

// lives & chat parameters
pub const STARTING_LIVES_DEFAULT: Lives = 5;
pub const STARTING_LIVES_MAX: Lives = 10;
pub const CHAT_LOG_CAP: usize = 100;
pub const CHAT_THROTTLE_MS: Millis = 750;
pub const CHAT_MAX_CHARS: usize = 200;

// reconnect replay parameters
pub const ACTION_SYNC_TTL_MS: Millis = 60_000;

// snapshot parameters
pub const SNAPSHOT_VERSION: u32 = 1;
pub const SNAPSHOT_INTERVAL_MS: Millis = 30_000;

/// trait for random generation, mainly (strictly?) for testing
pub trait Arbitrary {
    fn random() -> Self;
}

/// Unique identifier trait for domain entities.
pub trait Unique<T = Self> {
    fn id(&self) -> ID<T>;
}

use std::cmp::Ordering;
use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;
use std::hash::Hash;
use std::hash::Hasher;
use std::marker::PhantomData;

/// Generic ID wrapper providing compile-time type safety over uuid::Uuid.
pub struct ID<T> {
    inner: uuid::Uuid,
    marker: PhantomData<T>,
}

impl<T> ID<T> {
    pub fn inner(&self) -> uuid::Uuid {
        self.inner
    }
    /// Cast ID<T> to ID<U> while preserving the underlying UUID.
    pub fn cast<U>(self) -> ID<U> {
        ID {
            inner: self.inner,
            marker: PhantomData,
        }
    }
    pub fn parse(s: &str) -> Option<Self> {
        uuid::Uuid::parse_str(s).ok().map(Self::from)
    }
}

impl<T> From<ID<T>> for uuid::Uuid {
    fn from(id: ID<T>) -> Self {
        id.inner()
    }
}
impl<T> From<uuid::Uuid> for ID<T> {
    fn from(inner: uuid::Uuid) -> Self {
        Self {
            inner,
            marker: PhantomData,
        }
    }
}

impl<T> Default for ID<T> {
    fn default() -> Self {
        Self {
            inner: uuid::Uuid::now_v7(),
            marker: PhantomData,
        }
    }
}

impl<T> Copy for ID<T> {}
impl<T> Clone for ID<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Eq for ID<T> {}
impl<T> PartialEq for ID<T> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<T> Ord for ID<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.inner.cmp(&other.inner)
    }
}
impl<T> PartialOrd for ID<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Hash for ID<T> {
    fn hash<H>(&self, state: &mut H)
    where
        H: Hasher,
    {
        self.inner.hash(state);
    }
}

impl<T> Debug for ID<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ID").field(&self.inner).finish()
    }
}
impl<T> Display for ID<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.inner, f)
    }
}

impl<T> serde::Serialize for ID<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.inner.serialize(serializer)
    }
}
impl<'de, T> serde::Deserialize<'de> for ID<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        uuid::Uuid::deserialize(deserializer).map(Self::from)
    }
}

/// Wall-clock milliseconds since the UNIX epoch.
/// Timestamps on entities and wire payloads all use this scale.
pub fn now_ms() -> Millis {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("time moves slow")
        .as_millis() as Millis
}

/// Initialize dual logging (terminal + file) with timestamped log files.
/// Creates `logs/` directory and writes DEBUG level to file, INFO to terminal.
pub fn log() {
    std::fs::create_dir_all("logs").expect("create logs directory");
    let config = simplelog::ConfigBuilder::new()
        .set_location_level(log::LevelFilter::Off)
        .set_target_level(log::LevelFilter::Off)
        .set_thread_level(log::LevelFilter::Off)
        .build();
    let time = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("time moves slow")
        .as_secs();
    let file = simplelog::WriteLogger::new(
        log::LevelFilter::Debug,
        config.clone(),
        std::fs::File::create(format!("logs/{}.log", time)).expect("create log file"),
    );
    let term = simplelog::TermLogger::new(
        log::LevelFilter::Info,
        config.clone(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );
    simplelog::CombinedLogger::init(vec![term, file]).expect("initialize logger");
}
