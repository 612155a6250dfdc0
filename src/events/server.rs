use super::error::ActionError;
use super::error::ErrorCode;
use super::views::DealtCard;
use super::views::GameStateView;
use super::views::GameSummary;
use super::views::GameStats;
use super::views::PlayerPublic;
use super::views::Standing;
use super::views::VisibleCard;
use crate::Bid;
use crate::Millis;
use crate::cards::Card;
use crate::state::ChatEntry;
use crate::state::EndReason;
use crate::state::GameId;
use crate::state::HostSettings;
use crate::state::Phase;
use crate::state::PlayerId;
use crate::state::RoomId;
use crate::state::RoundResult;
use crate::state::SessionId;
use serde::Serialize;
use std::collections::HashMap;

/// Messages sent from server to client over the socket.
/// Room-wide unless the constructor notes it is private; the dispatch
/// layer decides the audience, this enum fixes the shapes.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Handshake acknowledgement.
    #[serde(rename_all = "camelCase")]
    ConnectionStatus { status: ConnectionKind },
    /// Private join confirmation with the full room picture.
    #[serde(rename_all = "camelCase")]
    RoomJoined {
        room_id: RoomId,
        player_id: PlayerId,
        session_id: SessionId,
        is_host: bool,
        is_spectator: bool,
        current_players: Vec<PlayerPublic>,
        spectators: Vec<PlayerPublic>,
        host_settings: HostSettings,
        chat_messages: Vec<ChatEntry>,
        game_state: Option<GameSummary>,
    },
    #[serde(rename_all = "camelCase")]
    PlayerJoined { player: PlayerPublic },
    #[serde(rename_all = "camelCase")]
    SpectatorJoined { player: PlayerPublic },
    #[serde(rename_all = "camelCase")]
    PlayerLeft {
        player_id: PlayerId,
        display_name: String,
        reason: LeaveReason,
    },
    #[serde(rename_all = "camelCase")]
    SpectatorLeft {
        player_id: PlayerId,
        display_name: String,
    },
    /// Private acknowledgement of a voluntary leave.
    RoomLeft,
    #[serde(rename_all = "camelCase")]
    GameStarted {
        game_id: GameId,
        player_order: Vec<PlayerId>,
        host_settings: HostSettings,
    },
    #[serde(rename_all = "camelCase")]
    RoundStarted {
        round_number: u32,
        card_count: usize,
        vira_card: Card,
        is_blind_round: bool,
    },
    /// Private. The only message that ever carries card faces.
    #[serde(rename_all = "camelCase")]
    CardsDealt {
        hand: Vec<DealtCard>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        visible_cards: Vec<VisibleCard>,
    },
    #[serde(rename_all = "camelCase")]
    BiddingTurn {
        current_player: PlayerId,
        valid_bids: Vec<Bid>,
        restricted_bid: Option<Bid>,
        is_last_bidder: bool,
        deadline: Millis,
        time_left: Millis,
        metadata: BiddingMeta,
    },
    #[serde(rename_all = "camelCase")]
    BidSubmitted {
        player_id: PlayerId,
        bid: Bid,
        all_bids: HashMap<PlayerId, Bid>,
    },
    #[serde(rename_all = "camelCase")]
    TrickStarted {
        trick_number: u32,
        lead_player: PlayerId,
    },
    #[serde(rename_all = "camelCase")]
    CardPlayed {
        player_id: PlayerId,
        card: Card,
        next_player: Option<PlayerId>,
        current_leader: Option<PlayerId>,
        winning_card: Option<Card>,
        cancelled_cards: Vec<Card>,
    },
    #[serde(rename_all = "camelCase")]
    TrickCompleted {
        trick_number: u32,
        cards_played: HashMap<PlayerId, Card>,
        winner: Option<PlayerId>,
        cancelled_cards: Vec<Card>,
        next_trick: bool,
    },
    #[serde(rename_all = "camelCase")]
    RoundCompleted {
        round_number: u32,
        results: HashMap<PlayerId, RoundResult>,
        eliminated_players: Vec<PlayerId>,
    },
    #[serde(rename_all = "camelCase")]
    GameCompleted {
        winner: Option<Standing>,
        final_standings: Vec<Standing>,
        game_stats: GameStats,
        reason: EndReason,
    },
    #[serde(rename_all = "camelCase")]
    TurnTimerUpdate {
        room_id: RoomId,
        game_id: GameId,
        player_id: PlayerId,
        phase: Phase,
        deadline: Millis,
        duration: Millis,
    },
    #[serde(rename_all = "camelCase")]
    GameTimerUpdate {
        remaining_ms: Millis,
        status: GameClockStatus,
    },
    #[serde(rename_all = "camelCase")]
    AutoAction {
        player_id: PlayerId,
        action: AutoKind,
        value: serde_json::Value,
        reason: AutoReason,
    },
    /// Private full-state refresh on reconnect.
    #[serde(rename_all = "camelCase")]
    GameStateUpdate {
        game_state: GameStateView,
        your_player_id: PlayerId,
        last_update_time: Millis,
    },
    /// Private replay of the last accepted action, within its TTL.
    #[serde(rename_all = "camelCase")]
    ActionSync {
        action: String,
        payload: serde_json::Value,
        metadata: serde_json::Value,
        status: String,
        recorded_at: Millis,
    },
    #[serde(rename_all = "camelCase")]
    ActionError {
        action: String,
        error: ErrorCode,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<serde_json::Value>,
    },
    #[serde(rename_all = "camelCase")]
    JoinError { error: ErrorCode, message: String },
    #[serde(rename_all = "camelCase")]
    ChatMessageReceived {
        #[serde(flatten)]
        entry: ChatEntry,
    },
    #[serde(rename_all = "camelCase")]
    HostSettingsUpdated {
        room_id: RoomId,
        host_settings: HostSettings,
    },
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionKind {
    Connected,
    Reconnected,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaveReason {
    Left,
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameClockStatus {
    Running,
    Warning,
    Expired,
    Completed,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoKind {
    AutoBid,
    AutoCard,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoReason {
    Timeout,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BiddingMeta {
    pub is_blind_round: bool,
    pub card_count: usize,
}

impl ServerMessage {
    pub fn connected() -> Self {
        Self::ConnectionStatus {
            status: ConnectionKind::Connected,
        }
    }
    pub fn reconnected() -> Self {
        Self::ConnectionStatus {
            status: ConnectionKind::Reconnected,
        }
    }
    pub fn action_error(action: &str, err: ActionError) -> Self {
        Self::ActionError {
            action: action.to_string(),
            error: err.code,
            message: err.message,
            details: err.details,
        }
    }
    pub fn join_error(err: ActionError) -> Self {
        Self::JoinError {
            error: err.code,
            message: err.message,
        }
    }
    pub fn chat(entry: ChatEntry) -> Self {
        Self::ChatMessageReceived { entry }
    }
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("serialize server message")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_snake_case_type() {
        let json = ServerMessage::connected().to_json();
        let value: serde_json::Value = serde_json::from_str(&json).expect("parse");
        assert_eq!(value["type"], "connection_status");
        assert_eq!(value["status"], "connected");
    }

    #[test]
    fn action_error_carries_code() {
        let err = ActionError::new(ErrorCode::InvalidTurn, "not your turn");
        let json = ServerMessage::action_error("play_card", err).to_json();
        let value: serde_json::Value = serde_json::from_str(&json).expect("parse");
        assert_eq!(value["type"], "action_error");
        assert_eq!(value["error"], "invalid_turn");
        assert_eq!(value["action"], "play_card");
    }

    #[test]
    fn camel_case_fields() {
        let msg = ServerMessage::GameTimerUpdate {
            remaining_ms: 1234,
            status: GameClockStatus::Warning,
        };
        let value: serde_json::Value =
            serde_json::from_str(&msg.to_json()).expect("parse");
        assert_eq!(value["remainingMs"], 1234);
        assert_eq!(value["status"], "warning");
    }
}
