use super::chat::ChatLog;
use super::player::PlayerId;
use crate::Lives;
use crate::MAX_SEATED;
use crate::Millis;
use crate::ROUND_GAP_DEFAULT_MS;
use crate::STARTING_LIVES_DEFAULT;
use crate::TURN_TIMER_DEFAULT_SECS;
use crate::TURN_TIMER_MAX_SECS;
use crate::TURN_TIMER_MIN_SECS;
use serde::Deserialize;
use serde::Serialize;

/// Stable room identifier drawn from the fixed set configured at
/// startup. Rooms are created once and never destroyed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
impl From<String> for RoomId {
    fn from(s: String) -> Self {
        Self(s)
    }
}
impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Waiting,
    Playing,
}

/// Host-tunable knobs, all bounded server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostSettings {
    pub starting_lives: Lives,
    pub turn_timer_seconds: u64,
    pub allow_spectator_chat: bool,
    pub round_transition_delay_ms: Millis,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            starting_lives: STARTING_LIVES_DEFAULT,
            turn_timer_seconds: TURN_TIMER_DEFAULT_SECS,
            allow_spectator_chat: true,
            round_transition_delay_ms: ROUND_GAP_DEFAULT_MS,
        }
    }
}

impl HostSettings {
    /// Turn timer with the server-side clamp applied.
    pub fn turn_timer_clamped(&self) -> u64 {
        self.turn_timer_seconds
            .clamp(TURN_TIMER_MIN_SECS, TURN_TIMER_MAX_SECS)
    }
}

/// A named table. Seating is ordered (it becomes the player order at
/// game start); spectators are unbounded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    id: RoomId,
    display_name: String,
    status: RoomStatus,
    seated: Vec<PlayerId>,
    spectators: Vec<PlayerId>,
    settings: HostSettings,
    chat: ChatLog,
    last_activity: Millis,
}

impl Room {
    pub fn new(id: RoomId, display_name: String, now: Millis) -> Self {
        Self {
            id,
            display_name,
            status: RoomStatus::Waiting,
            seated: Vec::new(),
            spectators: Vec::new(),
            settings: HostSettings::default(),
            chat: ChatLog::default(),
            last_activity: now,
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }
    pub fn display_name(&self) -> &str {
        &self.display_name
    }
    pub fn status(&self) -> RoomStatus {
        self.status
    }
    pub fn seated(&self) -> &[PlayerId] {
        &self.seated
    }
    pub fn spectators(&self) -> &[PlayerId] {
        &self.spectators
    }
    pub fn settings(&self) -> &HostSettings {
        &self.settings
    }
    pub fn settings_mut(&mut self) -> &mut HostSettings {
        &mut self.settings
    }
    pub fn chat(&self) -> &ChatLog {
        &self.chat
    }
    pub fn chat_mut(&mut self) -> &mut ChatLog {
        &mut self.chat
    }
    pub fn last_activity(&self) -> Millis {
        self.last_activity
    }

    pub fn is_full(&self) -> bool {
        self.seated.len() >= MAX_SEATED
    }
    pub fn is_playing(&self) -> bool {
        self.status == RoomStatus::Playing
    }
    pub fn set_status(&mut self, status: RoomStatus) {
        self.status = status;
    }
    pub fn touch(&mut self, now: Millis) {
        self.last_activity = now;
    }

    pub fn seat(&mut self, player: PlayerId) {
        if !self.seated.contains(&player) {
            self.seated.push(player);
        }
    }
    pub fn spectate(&mut self, player: PlayerId) {
        if !self.spectators.contains(&player) {
            self.spectators.push(player);
        }
    }
    /// Moves an eliminated player from the seating into the
    /// spectator set, preserving relative order of the rest.
    pub fn unseat_to_spectator(&mut self, player: PlayerId) {
        self.seated.retain(|p| *p != player);
        self.spectate(player);
    }
    /// Moves a participant back into the seating after a game ends.
    pub fn reseat(&mut self, player: PlayerId) {
        self.spectators.retain(|p| *p != player);
        self.seat(player);
    }
    /// Removes the player from both lists.
    pub fn evict(&mut self, player: PlayerId) {
        self.seated.retain(|p| *p != player);
        self.spectators.retain(|p| *p != player);
    }
    pub fn contains(&self, player: PlayerId) -> bool {
        self.seated.contains(&player) || self.spectators.contains(&player)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turn_timer_clamps() {
        let mut settings = HostSettings::default();
        assert_eq!(settings.turn_timer_clamped(), 20);
        settings.turn_timer_seconds = 2;
        assert_eq!(settings.turn_timer_clamped(), 5);
        settings.turn_timer_seconds = 90;
        assert_eq!(settings.turn_timer_clamped(), 30);
    }

    #[test]
    fn eliminated_player_moves_to_spectators() {
        let mut room = Room::new(RoomId::from("itajuba"), "Itajubá".into(), 0);
        let a = PlayerId::default();
        let b = PlayerId::default();
        room.seat(a);
        room.seat(b);
        room.unseat_to_spectator(a);
        assert_eq!(room.seated(), &[b]);
        assert_eq!(room.spectators(), &[a]);
        room.reseat(a);
        assert_eq!(room.seated(), &[b, a]);
        assert!(room.spectators().is_empty());
    }

    #[test]
    fn seat_is_idempotent() {
        let mut room = Room::new(RoomId::from("itajuba"), "Itajubá".into(), 0);
        let a = PlayerId::default();
        room.seat(a);
        room.seat(a);
        assert_eq!(room.seated().len(), 1);
    }
}
