use crate::Bid;
use crate::Lives;
use crate::Millis;
use crate::Unique;
use crate::cards::Card;
use crate::state::ConnectionStatus;
use crate::state::GameId;
use crate::state::GameSession;
use crate::state::Phase;
use crate::state::Play;
use crate::state::Player;
use crate::state::PlayerId;
use crate::state::RoomId;
use serde::Serialize;
use std::collections::HashMap;

/// What the room broadcasts about a player. Never includes cards.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerPublic {
    pub player_id: PlayerId,
    pub display_name: String,
    pub lives: Lives,
    pub is_host: bool,
    pub is_spectator: bool,
    pub connection_status: ConnectionStatus,
    pub tricks_won: u8,
    pub current_bid: Option<Bid>,
}

impl From<&Player> for PlayerPublic {
    fn from(p: &Player) -> Self {
        Self {
            player_id: p.id(),
            display_name: p.display_name().to_string(),
            lives: p.lives(),
            is_host: p.is_host(),
            is_spectator: p.is_spectator(),
            connection_status: p.connection(),
            tricks_won: p.tricks_won(),
            current_bid: p.bid(),
        }
    }
}

/// Compact active-game summary for room listings and `room_joined`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSummary {
    pub game_id: GameId,
    pub phase: Phase,
    pub round_number: u32,
    pub current_player: Option<PlayerId>,
}

impl From<&GameSession> for GameSummary {
    fn from(g: &GameSession) -> Self {
        Self {
            game_id: g.id(),
            phase: g.phase,
            round_number: g.round,
            current_player: g.current_player(),
        }
    }
}

/// A card as dealt to a client. The blind round replaces the
/// recipient's own cards with bare `hidden` markers.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum DealtCard {
    Shown(Card),
    Hidden { hidden: bool },
}

impl DealtCard {
    pub fn shown(card: Card) -> Self {
        Self::Shown(card)
    }
    pub fn hidden() -> Self {
        Self::Hidden { hidden: true }
    }
}

/// Another player's actual card, shown during the blind round.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibleCard {
    pub owner_id: PlayerId,
    pub owner_display_name: String,
    pub card: Card,
}

/// Final ranking entry for `game_completed`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Standing {
    pub player_id: PlayerId,
    pub display_name: String,
    pub lives_remaining: Lives,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStats {
    pub rounds_played: u32,
    pub duration_ms: Millis,
}

/// Redacted full-state snapshot for a reconnecting client. Carries
/// hand sizes, never hand contents; `cards_dealt` is the only
/// private-card channel.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStateView {
    pub game_id: GameId,
    pub room_id: RoomId,
    pub phase: Phase,
    pub round_number: u32,
    pub card_count: Option<usize>,
    pub vira_card: Option<Card>,
    pub is_blind_round: bool,
    pub player_order: Vec<PlayerId>,
    pub current_player: Option<PlayerId>,
    pub bids: HashMap<PlayerId, Bid>,
    pub tricks_won: HashMap<PlayerId, u8>,
    pub hand_counts: HashMap<PlayerId, usize>,
    pub current_trick: Option<TrickView>,
    pub time_limit_ms: Millis,
    pub started_at: Millis,
    pub remaining_ms: Millis,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrickView {
    pub trick_number: u32,
    pub lead_player: PlayerId,
    pub plays: Vec<Play>,
}

impl GameStateView {
    pub fn redacted(game: &GameSession, now: Millis) -> Self {
        let round = game.current_round();
        Self {
            game_id: game.id(),
            room_id: game.room().clone(),
            phase: game.phase,
            round_number: game.round,
            card_count: round.map(|r| r.card_count),
            vira_card: round.map(|r| r.vira),
            is_blind_round: round.map(|r| r.blind).unwrap_or(false),
            player_order: game.order.clone(),
            current_player: game.current_player(),
            bids: round.map(|r| r.bids.clone()).unwrap_or_default(),
            tricks_won: round
                .map(|r| {
                    r.tricks
                        .iter()
                        .filter_map(|t| t.winner)
                        .fold(HashMap::new(), |mut acc, w| {
                            *acc.entry(w).or_insert(0) += 1;
                            acc
                        })
                })
                .unwrap_or_default(),
            hand_counts: round
                .map(|r| r.hands.iter().map(|(p, h)| (*p, h.len())).collect())
                .unwrap_or_default(),
            current_trick: round.and_then(|r| r.current_trick()).map(|t| TrickView {
                trick_number: t.number,
                lead_player: t.lead,
                plays: t.plays.clone(),
            }),
            time_limit_ms: game.time_limit_ms,
            started_at: game.started_at,
            remaining_ms: game.remaining_ms(now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::Rank;
    use crate::cards::Suit;
    use crate::state::GameRound;
    use crate::state::Trick;

    #[test]
    fn dealt_card_wire_shapes() {
        let shown = DealtCard::shown(Card::from((Rank::Ace, Suit::Hearts)));
        let json = serde_json::to_value(&shown).expect("serialize");
        assert_eq!(json["rank"], "A");
        assert_eq!(json["suit"], "hearts");
        let hidden = serde_json::to_value(DealtCard::hidden()).expect("serialize");
        assert_eq!(hidden["hidden"], true);
        assert!(hidden.get("rank").is_none());
    }

    #[test]
    fn redacted_view_has_no_hands() {
        let order = vec![PlayerId::default(), PlayerId::default()];
        let mut game = GameSession::new(RoomId::from("itajuba"), order.clone(), None, 0);
        let vira = Card::from((Rank::King, Suit::Hearts));
        let mut round = GameRound::new(1, 1, vira, Rank::Ace);
        round
            .hands
            .insert(order[0], vec![Card::from((Rank::Four, Suit::Clubs))]);
        round
            .hands
            .insert(order[1], vec![Card::from((Rank::Ace, Suit::Hearts))]);
        round.tricks.push(Trick::open(1, order[0]));
        game.rounds.push(round);
        game.round = 1;
        game.phase = Phase::Bidding;
        let view = GameStateView::redacted(&game, 10);
        assert_eq!(view.hand_counts.len(), 2);
        let json = serde_json::to_string(&view).expect("serialize");
        assert!(!json.contains("\"hands\""));
        assert!(view.hand_counts.values().all(|n| *n == 1));
    }
}
