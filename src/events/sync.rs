use crate::ACTION_SYNC_TTL_MS;
use crate::Millis;
use crate::state::PlayerId;
use std::collections::HashMap;

/// The most recent accepted (or auto) action per player, replayed
/// once on reconnect while fresh. Entries self-expire after the TTL.
#[derive(Debug, Clone)]
pub struct CachedAction {
    pub action: String,
    pub payload: serde_json::Value,
    pub auto: bool,
    pub recorded_at: Millis,
}

#[derive(Debug, Default)]
pub struct ActionCache {
    entries: HashMap<PlayerId, CachedAction>,
}

impl ActionCache {
    pub fn record(
        &mut self,
        player: PlayerId,
        action: &str,
        payload: serde_json::Value,
        auto: bool,
        now: Millis,
    ) {
        self.entries.retain(|_, e| now.saturating_sub(e.recorded_at) < ACTION_SYNC_TTL_MS);
        self.entries.insert(
            player,
            CachedAction {
                action: action.to_string(),
                payload,
                auto,
                recorded_at: now,
            },
        );
    }

    /// Removes and returns the player's entry if still within TTL.
    /// The cache is cleared for that player either way.
    pub fn take_fresh(&mut self, player: PlayerId, now: Millis) -> Option<CachedAction> {
        self.entries
            .remove(&player)
            .filter(|e| now.saturating_sub(e.recorded_at) < ACTION_SYNC_TTL_MS)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replays_once_within_ttl() {
        let mut cache = ActionCache::default();
        let p = PlayerId::default();
        cache.record(p, "submit_bid", serde_json::json!({"bid": 0}), false, 1_000);
        let hit = cache.take_fresh(p, 2_000).expect("fresh");
        assert_eq!(hit.action, "submit_bid");
        assert!(cache.take_fresh(p, 2_000).is_none());
    }

    #[test]
    fn stale_entries_drop() {
        let mut cache = ActionCache::default();
        let p = PlayerId::default();
        cache.record(p, "play_card", serde_json::json!({}), true, 1_000);
        assert!(cache.take_fresh(p, 1_000 + ACTION_SYNC_TTL_MS).is_none());
    }
}
