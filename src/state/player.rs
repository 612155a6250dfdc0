use super::room::RoomId;
use crate::Bid;
use crate::ID;
use crate::Lives;
use crate::Millis;
use crate::Unique;
use crate::cards::Card;
use serde::Deserialize;
use serde::Serialize;

/// Marker for transport (socket connection) identifiers. A player's
/// transport id changes on every reconnect; their [`PlayerId`] does not.
#[derive(Debug, Clone, Copy)]
pub struct Transport;

pub type PlayerId = ID<Player>;
pub type ConnId = ID<Transport>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
}

/// A participant in a room. Stable across transport reconnects; the
/// session side-table maps back here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    id: PlayerId,
    display_name: String,
    room: RoomId,
    #[serde(skip)]
    transport: Option<ConnId>,
    lives: Lives,
    host: bool,
    spectator: bool,
    connection: ConnectionStatus,
    hand: Vec<Card>,
    bid: Option<Bid>,
    tricks_won: u8,
    joined_at: Millis,
    last_seen_at: Millis,
}

impl Player {
    pub fn new(
        display_name: String,
        room: RoomId,
        transport: ConnId,
        lives: Lives,
        spectator: bool,
        now: Millis,
    ) -> Self {
        Self {
            id: PlayerId::default(),
            display_name,
            room,
            transport: Some(transport),
            lives,
            host: false,
            spectator,
            connection: ConnectionStatus::Connected,
            hand: Vec::new(),
            bid: None,
            tricks_won: 0,
            joined_at: now,
            last_seen_at: now,
        }
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }
    pub fn room(&self) -> &RoomId {
        &self.room
    }
    pub fn transport(&self) -> Option<ConnId> {
        self.transport
    }
    pub fn lives(&self) -> Lives {
        self.lives
    }
    pub fn is_host(&self) -> bool {
        self.host
    }
    pub fn is_spectator(&self) -> bool {
        self.spectator
    }
    pub fn is_connected(&self) -> bool {
        self.connection == ConnectionStatus::Connected
    }
    pub fn connection(&self) -> ConnectionStatus {
        self.connection
    }
    pub fn hand(&self) -> &[Card] {
        &self.hand
    }
    pub fn bid(&self) -> Option<Bid> {
        self.bid
    }
    pub fn tricks_won(&self) -> u8 {
        self.tricks_won
    }
    pub fn joined_at(&self) -> Millis {
        self.joined_at
    }
    pub fn last_seen_at(&self) -> Millis {
        self.last_seen_at
    }

    pub fn set_host(&mut self, host: bool) {
        self.host = host;
    }
    pub fn set_spectator(&mut self, spectator: bool) {
        self.spectator = spectator;
    }
    pub fn set_lives(&mut self, lives: Lives) {
        self.lives = lives;
    }
    pub fn lose_lives(&mut self, n: Lives) {
        self.lives = self.lives.saturating_sub(n);
    }

    /// New round: replaces the hand and clears per-round counters.
    pub fn deal(&mut self, hand: Vec<Card>) {
        self.hand = hand;
        self.bid = None;
        self.tricks_won = 0;
    }
    pub fn set_bid(&mut self, bid: Bid) {
        self.bid = Some(bid);
    }
    pub fn take_card(&mut self, card: &Card) -> bool {
        match self.hand.iter().position(|c| c == card) {
            Some(i) => {
                self.hand.remove(i);
                true
            }
            None => false,
        }
    }
    pub fn win_trick(&mut self) {
        self.tricks_won += 1;
    }

    pub fn disconnect(&mut self, now: Millis) {
        self.connection = ConnectionStatus::Disconnected;
        self.transport = None;
        self.last_seen_at = now;
    }
    pub fn reconnect(&mut self, transport: ConnId, now: Millis) {
        self.connection = ConnectionStatus::Connected;
        self.transport = Some(transport);
        self.last_seen_at = now;
    }
    pub fn touch(&mut self, now: Millis) {
        self.last_seen_at = now;
    }
}

impl Unique for Player {
    fn id(&self) -> PlayerId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::Rank;
    use crate::cards::Suit;

    fn player() -> Player {
        Player::new(
            "Maria Jose".into(),
            RoomId::from("itajuba"),
            ConnId::default(),
            5,
            false,
            1_000,
        )
    }

    #[test]
    fn lives_floor_at_zero() {
        let mut p = player();
        p.lose_lives(3);
        assert_eq!(p.lives(), 2);
        p.lose_lives(9);
        assert_eq!(p.lives(), 0);
    }

    #[test]
    fn take_card_removes_exactly_one() {
        let mut p = player();
        let ace = Card::from((Rank::Ace, Suit::Hearts));
        let two = Card::from((Rank::Two, Suit::Clubs));
        p.deal(vec![ace, two]);
        assert!(p.take_card(&ace));
        assert!(!p.take_card(&ace));
        assert_eq!(p.hand(), &[two]);
    }

    #[test]
    fn deal_resets_round_counters() {
        let mut p = player();
        p.set_bid(2);
        p.win_trick();
        p.deal(vec![]);
        assert_eq!(p.bid(), None);
        assert_eq!(p.tricks_won(), 0);
    }

    #[test]
    fn disconnect_clears_transport() {
        let mut p = player();
        assert!(p.transport().is_some());
        p.disconnect(2_000);
        assert!(p.transport().is_none());
        assert!(!p.is_connected());
        assert_eq!(p.last_seen_at(), 2_000);
    }
}
