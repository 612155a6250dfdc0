use crate::cards::Card;
use serde::Deserialize;

/// Intents received from clients. Anything that fails to parse into
/// this enum is malformed and answered with a typed error before it
/// can touch the engine.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    #[serde(rename_all = "camelCase")]
    JoinRoom {
        room_id: String,
        display_name: String,
        #[serde(default)]
        spectator: bool,
    },
    LeaveRoom {},
    StartGame {},
    SubmitBid {
        bid: i64,
    },
    PlayCard {
        card: WireCard,
    },
    ChatMessage {
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    UpdateHostSettings {
        #[serde(default)]
        allow_spectator_chat: Option<bool>,
        #[serde(default)]
        turn_timer: Option<i64>,
        #[serde(default)]
        starting_lives: Option<i64>,
    },
}

impl ClientMessage {
    /// Wire name used when reporting errors back for this intent.
    pub fn action(&self) -> &'static str {
        match self {
            Self::JoinRoom { .. } => "join_room",
            Self::LeaveRoom {} => "leave_room",
            Self::StartGame {} => "start_game",
            Self::SubmitBid { .. } => "submit_bid",
            Self::PlayCard { .. } => "play_card",
            Self::ChatMessage { .. } => "chat_message",
            Self::UpdateHostSettings { .. } => "update_host_settings",
        }
    }
}

/// Card as submitted by a client; parsed (not trusted) before use.
#[derive(Debug, Clone, Deserialize)]
pub struct WireCard {
    pub rank: String,
    pub suit: String,
}

impl WireCard {
    pub fn parse(&self) -> Option<Card> {
        let rank = self.rank.parse().ok()?;
        let suit = self.suit.parse().ok()?;
        Some(Card::from((rank, suit)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::Rank;
    use crate::cards::Suit;

    #[test]
    fn parses_tagged_intents() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"type":"join_room","roomId":"itajuba","displayName":"Ana Clara"}"#,
        )
        .expect("parse");
        match msg {
            ClientMessage::JoinRoom {
                room_id,
                display_name,
                spectator,
            } => {
                assert_eq!(room_id, "itajuba");
                assert_eq!(display_name, "Ana Clara");
                assert!(!spectator);
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn parses_play_card() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"type":"play_card","card":{"rank":"Q","suit":"clubs"}}"#,
        )
        .expect("parse");
        match msg {
            ClientMessage::PlayCard { card } => {
                assert_eq!(card.parse(), Some(Card::from((Rank::Queen, Suit::Clubs))));
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn rejects_unknown_type() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"hack"}"#).is_err());
    }

    #[test]
    fn rejects_bad_card() {
        let card = WireCard {
            rank: "11".into(),
            suit: "stars".into(),
        };
        assert!(card.parse().is_none());
    }
}
