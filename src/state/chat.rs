use super::player::PlayerId;
use crate::CHAT_LOG_CAP;
use crate::CHAT_MAX_CHARS;
use crate::CHAT_THROTTLE_MS;
use crate::ID;
use crate::Millis;
use serde::Deserialize;
use serde::Serialize;
use std::collections::HashMap;
use std::collections::VecDeque;

pub type ChatMessageId = ID<ChatEntry>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatKind {
    Player,
    Spectator,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatEntry {
    pub message_id: ChatMessageId,
    pub player_id: Option<PlayerId>,
    pub display_name: String,
    pub message: String,
    pub timestamp: Millis,
    /// Named `messageType` on the wire: the envelope already uses
    /// `type` for the event tag.
    #[serde(rename = "messageType")]
    pub kind: ChatKind,
    pub is_spectator: bool,
}

impl ChatEntry {
    pub fn system(message: String, now: Millis) -> Self {
        Self {
            message_id: ChatMessageId::default(),
            player_id: None,
            display_name: "system".to_string(),
            message,
            timestamp: now,
            kind: ChatKind::System,
            is_spectator: false,
        }
    }
}

/// Ring buffer of the most recent room chat, plus per-sender throttle
/// bookkeeping (which is runtime-only and not persisted).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatLog {
    entries: VecDeque<ChatEntry>,
    #[serde(skip)]
    last_sent: HashMap<PlayerId, Millis>,
}

impl ChatLog {
    pub fn entries(&self) -> impl Iterator<Item = &ChatEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when the sender posted within the throttle window.
    pub fn throttled(&self, sender: PlayerId, now: Millis) -> bool {
        self.last_sent
            .get(&sender)
            .map(|last| now.saturating_sub(*last) < CHAT_THROTTLE_MS)
            .unwrap_or(false)
    }

    pub fn push(&mut self, entry: ChatEntry) {
        if let Some(sender) = entry.player_id {
            self.last_sent.insert(sender, entry.timestamp);
        }
        self.entries.push_back(entry);
        while self.entries.len() > CHAT_LOG_CAP {
            self.entries.pop_front();
        }
    }
}

/// Collapses whitespace runs, strips anything tag-shaped, and caps
/// the length. Returns None when nothing displayable remains.
pub fn sanitize(message: &str) -> Option<String> {
    let mut out = String::with_capacity(message.len().min(CHAT_MAX_CHARS));
    let mut in_tag = false;
    let mut last_space = true;
    for c in message.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if in_tag => {}
            c if c.is_whitespace() => {
                if !last_space {
                    out.push(' ');
                    last_space = true;
                }
            }
            c => {
                out.push(c);
                last_space = false;
            }
        }
    }
    let trimmed = out.trim_end();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(CHAT_MAX_CHARS).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(sender: PlayerId, at: Millis) -> ChatEntry {
        ChatEntry {
            message_id: ChatMessageId::default(),
            player_id: Some(sender),
            display_name: "Ana".into(),
            message: "oi".into(),
            timestamp: at,
            kind: ChatKind::Player,
            is_spectator: false,
        }
    }

    #[test]
    fn ring_caps_at_limit() {
        let mut log = ChatLog::default();
        let sender = PlayerId::default();
        for i in 0..(CHAT_LOG_CAP as u64 + 10) {
            log.push(entry(sender, i * 10_000));
        }
        assert_eq!(log.len(), CHAT_LOG_CAP);
        assert_eq!(log.entries().next().map(|e| e.timestamp), Some(100_000));
    }

    #[test]
    fn throttle_window() {
        let mut log = ChatLog::default();
        let sender = PlayerId::default();
        log.push(entry(sender, 10_000));
        assert!(log.throttled(sender, 10_000 + CHAT_THROTTLE_MS - 1));
        assert!(!log.throttled(sender, 10_000 + CHAT_THROTTLE_MS));
        assert!(!log.throttled(PlayerId::default(), 10_100));
    }

    #[test]
    fn sanitize_strips_tags_and_collapses() {
        assert_eq!(
            sanitize("  hello   <script>evil()</script>  world  "),
            Some("hello world".to_string())
        );
        assert_eq!(sanitize("<b></b>"), None);
        assert_eq!(sanitize("   "), None);
    }

    #[test]
    fn sanitize_caps_length() {
        let long = "a".repeat(500);
        assert_eq!(sanitize(&long).map(|s| s.len()), Some(CHAT_MAX_CHARS));
    }
}
