use super::server::ServerMessage;
use crate::state::ConnId;
use crate::state::PlayerId;
use std::collections::HashMap;
use tokio::sync::mpsc::UnboundedSender;

/// Per-room registry of connected client outboxes. Events reach every
/// member of the room in emission order; private messages go to one
/// player's current transport only.
#[derive(Debug, Default)]
pub struct Fanout {
    sinks: HashMap<PlayerId, (ConnId, UnboundedSender<String>)>,
}

impl Fanout {
    pub fn attach(&mut self, player: PlayerId, conn: ConnId, sink: UnboundedSender<String>) {
        self.sinks.insert(player, (conn, sink));
    }

    /// Detaches only if the registered transport still matches, so a
    /// quick reconnect is not torn down by the old socket's cleanup.
    pub fn detach(&mut self, player: PlayerId, conn: ConnId) {
        if let Some((bound, _)) = self.sinks.get(&player) {
            if *bound == conn {
                self.sinks.remove(&player);
            }
        }
    }

    pub fn remove(&mut self, player: PlayerId) {
        self.sinks.remove(&player);
    }

    pub fn is_attached(&self, player: PlayerId) -> bool {
        self.sinks.contains_key(&player)
    }

    pub fn broadcast(&self, message: &ServerMessage) {
        let json = message.to_json();
        for (player, (_, sink)) in self.sinks.iter() {
            if sink.send(json.clone()).is_err() {
                log::warn!("broadcast to {} failed", player);
            }
        }
    }

    pub fn unicast(&self, player: PlayerId, message: &ServerMessage) {
        match self.sinks.get(&player) {
            Some((_, sink)) => {
                if sink.send(message.to_json()).is_err() {
                    log::warn!("unicast to {} failed", player);
                }
            }
            None => log::debug!("unicast to {}: not attached", player),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;

    #[test]
    fn broadcast_reaches_all_attached() {
        let mut fanout = Fanout::default();
        let (tx_a, mut rx_a) = unbounded_channel();
        let (tx_b, mut rx_b) = unbounded_channel();
        let (a, b) = (PlayerId::default(), PlayerId::default());
        fanout.attach(a, ConnId::default(), tx_a);
        fanout.attach(b, ConnId::default(), tx_b);
        fanout.broadcast(&ServerMessage::connected());
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_ok());
    }

    #[test]
    fn unicast_targets_one() {
        let mut fanout = Fanout::default();
        let (tx_a, mut rx_a) = unbounded_channel();
        let (tx_b, mut rx_b) = unbounded_channel();
        let (a, b) = (PlayerId::default(), PlayerId::default());
        fanout.attach(a, ConnId::default(), tx_a);
        fanout.attach(b, ConnId::default(), tx_b);
        fanout.unicast(a, &ServerMessage::reconnected());
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    fn stale_detach_is_ignored() {
        let mut fanout = Fanout::default();
        let (tx, _rx) = unbounded_channel();
        let player = PlayerId::default();
        let current = ConnId::default();
        fanout.attach(player, current, tx);
        fanout.detach(player, ConnId::default());
        assert!(fanout.is_attached(player));
        fanout.detach(player, current);
        assert!(!fanout.is_attached(player));
    }
}
