//! Domain entities: rooms, players, sessions, games, chat.
//!
//! Everything here is plain data with small invariant-preserving
//! helpers. Mutation sequencing lives in [`crate::engine`] and
//! [`crate::lobby`]; persistence shapes in [`crate::store`].

mod chat;
mod game;
mod player;
mod room;
mod session;

pub use chat::*;
pub use game::*;
pub use player::*;
pub use room::*;
pub use session::*;

use crate::events::ActionCache;
use std::collections::HashMap;

/// Everything one room owns: the room record, its players, and the
/// active game. Guarded by a single per-room lock in the dispatch
/// layer; different rooms progress in parallel.
#[derive(Debug)]
pub struct RoomState {
    pub room: Room,
    pub players: HashMap<PlayerId, Player>,
    pub game: Option<GameSession>,
    pub sync: ActionCache,
}

impl RoomState {
    pub fn new(room: Room) -> Self {
        Self {
            room,
            players: HashMap::new(),
            game: None,
            sync: ActionCache::default(),
        }
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    /// Seated, non-spectator players in seating order.
    pub fn seated(&self) -> Vec<&Player> {
        self.room
            .seated()
            .iter()
            .filter_map(|id| self.players.get(id))
            .collect()
    }

    /// Seated players currently connected.
    pub fn seated_connected(&self) -> Vec<&Player> {
        self.seated()
            .into_iter()
            .filter(|p| p.is_connected())
            .collect()
    }

    /// Display name for events; falls back to the raw id for players
    /// already removed from the room.
    pub fn display_name(&self, id: PlayerId) -> String {
        self.players
            .get(&id)
            .map(|p| p.display_name().to_string())
            .unwrap_or_else(|| id.to_string())
    }
}
