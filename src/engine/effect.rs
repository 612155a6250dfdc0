use crate::Millis;
use crate::events::ServerMessage;
use crate::state::PlayerId;

/// What the engine wants done after a transition. Messages are
/// emitted in order; timer effects are interpreted by the dispatch
/// layer, which owns the actual scheduled tasks.
#[derive(Debug)]
pub enum Effect {
    /// Send to every connected member of the room.
    Broadcast(ServerMessage),
    /// Send to one player's current transport.
    Unicast(PlayerId, ServerMessage),
    /// Schedule the turn timeout for the current turn.
    ArmTurn { serial: u64, duration_ms: Millis },
    /// Schedule the next trick to open after the configured gap.
    ArmTrickGap { serial: u64 },
    /// Schedule the next round to deal after the transition delay.
    ArmRoundGap { serial: u64, delay_ms: Millis },
    /// Start the whole-game deadline and its periodic tick.
    ArmGameClock,
    /// Cancel every timer owned by this room's game.
    CancelTimers,
}

impl Effect {
    /// Convenience for tests and logs: the broadcast payload, if any.
    pub fn as_broadcast(&self) -> Option<&ServerMessage> {
        match self {
            Self::Broadcast(msg) => Some(msg),
            _ => None,
        }
    }
    pub fn as_unicast(&self) -> Option<(PlayerId, &ServerMessage)> {
        match self {
            Self::Unicast(player, msg) => Some((*player, msg)),
            _ => None,
        }
    }
}
