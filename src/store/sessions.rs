use crate::Millis;
use crate::Unique;
use crate::state::PlayerId;
use crate::state::RoomId;
use crate::state::Session;
use crate::state::SessionId;
use std::collections::HashMap;

/// The session side-table: every live session across all rooms,
/// keyed by the id handed to clients at join time.
#[derive(Debug, Default)]
pub struct Sessions {
    map: HashMap<SessionId, Session>,
}

impl Sessions {
    pub fn create(&mut self, session: Session) -> SessionId {
        let id = session.id();
        self.map.insert(id, session);
        id
    }

    pub fn get(&self, id: SessionId) -> Option<&Session> {
        self.map.get(&id)
    }

    pub fn get_mut(&mut self, id: SessionId) -> Option<&mut Session> {
        self.map.get_mut(&id)
    }

    pub fn remove(&mut self, id: SessionId) -> Option<Session> {
        self.map.remove(&id)
    }

    pub fn list(&self) -> impl Iterator<Item = &Session> {
        self.map.values()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn find_by_player(&self, player: PlayerId) -> Option<SessionId> {
        self.map
            .iter()
            .find(|(_, s)| s.player() == player)
            .map(|(id, _)| *id)
    }

    /// Sessions in the given room whose grace window has lapsed.
    pub fn expired_in_room(&self, room: &RoomId, now: Millis) -> Vec<SessionId> {
        self.map
            .iter()
            .filter(|(_, s)| s.room() == room && s.is_expired(now))
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn restore(&mut self, sessions: Vec<Session>) {
        for session in sessions {
            self.map.insert(session.id(), session);
        }
    }
}
