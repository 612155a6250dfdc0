use super::player::PlayerId;
use super::room::RoomId;
use crate::ID;
use crate::Millis;
use crate::SESSION_GRACE_MS;
use crate::Unique;
use serde::Deserialize;
use serde::Serialize;

pub type SessionId = ID<Session>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Connected,
    Disconnected,
}

/// Transport-independent identity binding a player to a room across
/// socket drops. `expires_at` is set iff the session is disconnected;
/// expiry removes the player.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    id: SessionId,
    player: PlayerId,
    room: RoomId,
    status: SessionStatus,
    expires_at: Option<Millis>,
    metadata: serde_json::Value,
}

impl Session {
    pub fn new(player: PlayerId, room: RoomId) -> Self {
        Self {
            id: SessionId::default(),
            player,
            room,
            status: SessionStatus::Connected,
            expires_at: None,
            metadata: serde_json::Value::Null,
        }
    }

    pub fn player(&self) -> PlayerId {
        self.player
    }
    pub fn room(&self) -> &RoomId {
        &self.room
    }
    pub fn status(&self) -> SessionStatus {
        self.status
    }
    pub fn expires_at(&self) -> Option<Millis> {
        self.expires_at
    }
    pub fn metadata(&self) -> &serde_json::Value {
        &self.metadata
    }

    pub fn is_expired(&self, now: Millis) -> bool {
        self.expires_at.map(|at| at <= now).unwrap_or(false)
    }

    pub fn disconnect(&mut self, now: Millis) {
        self.status = SessionStatus::Disconnected;
        self.expires_at = Some(now + SESSION_GRACE_MS);
    }

    pub fn reconnect(&mut self) {
        self.status = SessionStatus::Connected;
        self.expires_at = None;
    }
}

impl Unique for Session {
    fn id(&self) -> SessionId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_set_iff_disconnected() {
        let mut session = Session::new(PlayerId::default(), RoomId::from("itajuba"));
        assert_eq!(session.expires_at(), None);
        session.disconnect(1_000);
        assert_eq!(session.expires_at(), Some(1_000 + SESSION_GRACE_MS));
        assert!(!session.is_expired(1_000));
        assert!(session.is_expired(1_000 + SESSION_GRACE_MS));
        session.reconnect();
        assert_eq!(session.expires_at(), None);
        assert_eq!(session.status(), SessionStatus::Connected);
    }
}
