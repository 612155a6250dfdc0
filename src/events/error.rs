use serde::Deserialize;
use serde::Serialize;

/// Machine-readable failure codes surfaced as `action_error` /
/// `join_error`. Grouped by cause; every code is recoverable and
/// implies the engine state did not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // validation
    InvalidRoom,
    InvalidName,
    NameTaken,
    InvalidBid,
    InvalidInteger,
    OutOfRange,
    InvalidCard,
    InvalidMessage,
    // authorization
    NotHost,
    SpectatorChatDisabled,
    NotPlayersTurn,
    RoomInProgress,
    // state
    InvalidPhase,
    AlreadyBid,
    CardNotInHand,
    CardAlreadyPlayed,
    GameNotActive,
    InvalidRound,
    InvalidTurn,
    LastBidderRestriction,
    InsufficientPlayers,
    GameInProgress,
    // session
    SessionNotFound,
    SessionExpired,
    SessionInvalidState,
    // capacity
    RoomFull,
    RoomNotFound,
    // internal
    InternalError,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let s = serde_json::to_value(self).expect("error code serializes");
        f.write_str(s.as_str().unwrap_or("internal_error"))
    }
}

/// Typed failure carried back to the offending sender.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ActionError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl std::fmt::Display for ActionError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ActionError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_render_snake_case() {
        assert_eq!(
            ErrorCode::LastBidderRestriction.to_string(),
            "last_bidder_restriction"
        );
        assert_eq!(ErrorCode::RoomFull.to_string(), "room_full");
    }
}
