use super::player::PlayerId;
use super::room::RoomId;
use crate::Bid;
use crate::GAME_TIME_LIMIT_MS;
use crate::ID;
use crate::Lives;
use crate::Millis;
use crate::Unique;
use crate::cards::Card;
use crate::cards::Rank;
use serde::Deserialize;
use serde::Serialize;
use std::collections::HashMap;

pub type GameId = ID<GameSession>;

/// Phase graph: waiting→bidding; bidding→{playing, completed};
/// playing→scoring; scoring→{bidding, completed}; completed→∅.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Waiting,
    Bidding,
    Playing,
    Scoring,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    Victory,
    InsufficientPlayers,
    Timeout,
}

/// One card placed into a trick.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Play {
    pub player: PlayerId,
    pub card: Card,
    pub at: Millis,
}

/// A single trick: ordered plays from the lead, the cancellation log,
/// and the winner once resolved (None when every play cancelled).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trick {
    pub number: u32,
    pub lead: PlayerId,
    pub plays: Vec<Play>,
    pub cancelled: Vec<Card>,
    pub winner: Option<PlayerId>,
    pub completed_at: Option<Millis>,
}

impl Trick {
    pub fn open(number: u32, lead: PlayerId) -> Self {
        Self {
            number,
            lead,
            plays: Vec::new(),
            cancelled: Vec::new(),
            winner: None,
            completed_at: None,
        }
    }

    pub fn has_played(&self, player: PlayerId) -> bool {
        self.plays.iter().any(|p| p.player == player)
    }

    pub fn is_closed(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// Scored outcome for one player in one round.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundResult {
    pub bid: Bid,
    pub actual: u8,
    pub lives_lost: Lives,
    pub lives_remaining: Lives,
}

/// One round: the vira, the dealt hands, the bids, and the tricks.
/// Round 1 is blind (players see everyone's card but their own).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRound {
    pub number: u32,
    pub card_count: usize,
    pub vira: Card,
    pub manilha: Rank,
    pub blind: bool,
    pub hands: HashMap<PlayerId, Vec<Card>>,
    pub bids: HashMap<PlayerId, Bid>,
    pub tricks: Vec<Trick>,
    pub results: Option<HashMap<PlayerId, RoundResult>>,
}

impl GameRound {
    pub fn new(number: u32, card_count: usize, vira: Card, manilha: Rank) -> Self {
        Self {
            number,
            card_count,
            vira,
            manilha,
            blind: number == 1,
            hands: HashMap::new(),
            bids: HashMap::new(),
            tricks: Vec::new(),
            results: None,
        }
    }

    pub fn current_trick(&self) -> Option<&Trick> {
        self.tricks.last()
    }
    pub fn current_trick_mut(&mut self) -> Option<&mut Trick> {
        self.tricks.last_mut()
    }
    pub fn is_scored(&self) -> bool {
        self.results.is_some()
    }
}

/// The authoritative per-room game. `order` is the seating at game
/// start, shrinking as players are eliminated between rounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSession {
    id: GameId,
    room: RoomId,
    pub order: Vec<PlayerId>,
    /// Seating at game start; unlike `order` this never shrinks, so
    /// standings and reseating cover eliminated players too.
    pub participants: Vec<PlayerId>,
    pub round: u32,
    pub phase: Phase,
    pub cursor: usize,
    pub rounds: Vec<GameRound>,
    pub time_limit_ms: Millis,
    pub started_at: Millis,
    pub ended_at: Option<Millis>,
    pub reason: Option<EndReason>,
    pub winner: Option<PlayerId>,
    /// Bumped on every turn change; timer callbacks carry the serial
    /// they were armed with and no-op on mismatch.
    #[serde(skip)]
    pub turn_serial: u64,
    /// (deadline, duration) of the armed turn timer, for replaying
    /// `turn_timer_update` to reconnecting clients. Not persisted:
    /// timers are never rearmed from a snapshot.
    #[serde(skip)]
    pub turn_deadline: Option<(Millis, Millis)>,
}

impl GameSession {
    pub fn new(room: RoomId, order: Vec<PlayerId>, time_limit_ms: Option<Millis>, now: Millis) -> Self {
        Self {
            id: GameId::default(),
            room,
            participants: order.clone(),
            order,
            round: 0,
            phase: Phase::Waiting,
            cursor: 0,
            rounds: Vec::new(),
            time_limit_ms: time_limit_ms.unwrap_or(GAME_TIME_LIMIT_MS),
            started_at: now,
            ended_at: None,
            reason: None,
            winner: None,
            turn_serial: 0,
            turn_deadline: None,
        }
    }

    pub fn room(&self) -> &RoomId {
        &self.room
    }

    pub fn is_completed(&self) -> bool {
        self.phase == Phase::Completed
    }

    pub fn remaining_ms(&self, now: Millis) -> Millis {
        (self.started_at + self.time_limit_ms).saturating_sub(now)
    }

    pub fn current_round(&self) -> Option<&GameRound> {
        self.rounds.last()
    }
    pub fn current_round_mut(&mut self) -> Option<&mut GameRound> {
        self.rounds.last_mut()
    }

    pub fn current_player(&self) -> Option<PlayerId> {
        self.order.get(self.cursor).copied()
    }

    pub fn position_of(&self, player: PlayerId) -> Option<usize> {
        self.order.iter().position(|p| *p == player)
    }

    /// Advances the cursor one seat, wrapping around the order.
    pub fn advance_cursor(&mut self) {
        if !self.order.is_empty() {
            self.cursor = (self.cursor + 1) % self.order.len();
            self.turn_serial += 1;
        }
    }

    /// Points the cursor at a specific player (trick winner leads next).
    pub fn set_cursor_to(&mut self, player: PlayerId) {
        if let Some(pos) = self.position_of(player) {
            self.cursor = pos;
            self.turn_serial += 1;
        }
    }

    /// Invalidates any timer armed against the previous serial.
    pub fn bump_serial(&mut self) {
        self.turn_serial += 1;
    }

    /// Drops a departed player from the turn order, keeping the
    /// cursor pointed at the same seat (or wrapped back to 0).
    pub fn drop_from_order(&mut self, player: PlayerId) {
        if let Some(pos) = self.position_of(player) {
            self.order.remove(pos);
            if pos < self.cursor {
                self.cursor -= 1;
            }
            if self.cursor >= self.order.len() {
                self.cursor = 0;
            }
            self.turn_serial += 1;
        }
    }

    /// Next seat after the cursor, cyclically, that has not yet played
    /// in the open trick and still holds cards.
    pub fn next_to_play(&self) -> Option<PlayerId> {
        let round = self.current_round()?;
        let trick = round.current_trick()?;
        (1..=self.order.len())
            .map(|step| (self.cursor + step) % self.order.len())
            .map(|pos| self.order[pos])
            .find(|p| {
                !trick.has_played(*p)
                    && round.hands.get(p).map(|h| !h.is_empty()).unwrap_or(false)
            })
    }

    /// True when every player in the order has a recorded bid.
    pub fn all_bids_in(&self) -> bool {
        match self.current_round() {
            Some(round) => self.order.iter().all(|p| round.bids.contains_key(p)),
            None => false,
        }
    }
}

impl Unique for GameSession {
    fn id(&self) -> GameId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::Suit;

    fn game(n: usize) -> GameSession {
        let order: Vec<PlayerId> = (0..n).map(|_| PlayerId::default()).collect();
        GameSession::new(RoomId::from("itajuba"), order, None, 0)
    }

    #[test]
    fn cursor_wraps() {
        let mut g = game(3);
        g.advance_cursor();
        g.advance_cursor();
        g.advance_cursor();
        assert_eq!(g.cursor, 0);
        assert_eq!(g.turn_serial, 3);
    }

    #[test]
    fn next_to_play_skips_emptied_hands() {
        let mut g = game(3);
        let (a, b, c) = (g.order[0], g.order[1], g.order[2]);
        let vira = Card::from((Rank::King, Suit::Hearts));
        let mut round = GameRound::new(2, 1, vira, Rank::Ace);
        round.hands.insert(a, vec![Card::from((Rank::Four, Suit::Clubs))]);
        round.hands.insert(b, vec![]);
        round.hands.insert(c, vec![Card::from((Rank::Five, Suit::Clubs))]);
        round.tricks.push(Trick::open(1, a));
        g.rounds.push(round);
        g.cursor = 0;
        assert_eq!(g.next_to_play(), Some(c));
    }

    #[test]
    fn remaining_clamps_at_zero() {
        let g = game(2);
        assert_eq!(g.remaining_ms(g.time_limit_ms + 1), 0);
    }

    #[test]
    fn blind_round_is_round_one() {
        let vira = Card::from((Rank::King, Suit::Hearts));
        assert!(GameRound::new(1, 1, vira, Rank::Ace).blind);
        assert!(!GameRound::new(2, 2, vira, Rank::Ace).blind);
    }
}
