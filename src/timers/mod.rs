//! Scheduled-task handles for one room's game.
//!
//! Each timer is a single tokio task that sleeps and then re-enters
//! the engine through the dispatch layer, reacquiring the room lock
//! and rechecking its turn serial (state may have advanced between
//! schedule and fire). The handles here exist so a superseded or
//! finished game can abort everything it scheduled.

use tokio::task::JoinHandle;

/// Handles for the four orthogonal timers of an active game.
#[derive(Debug, Default)]
pub struct TimerHandles {
    turn: Option<JoinHandle<()>>,
    trick_gap: Option<JoinHandle<()>>,
    round_gap: Option<JoinHandle<()>>,
    game_deadline: Option<JoinHandle<()>>,
    game_tick: Option<JoinHandle<()>>,
}

impl TimerHandles {
    /// Replaces the turn timer; the superseded task is aborted.
    pub fn set_turn(&mut self, handle: JoinHandle<()>) {
        if let Some(old) = self.turn.replace(handle) {
            old.abort();
        }
    }

    /// The trick gap is single-shot and never pre-empted; arming it
    /// also cancels any stale turn timer from the closed trick.
    pub fn set_trick_gap(&mut self, handle: JoinHandle<()>) {
        self.cancel_turn();
        if let Some(old) = self.trick_gap.replace(handle) {
            old.abort();
        }
    }

    pub fn set_round_gap(&mut self, handle: JoinHandle<()>) {
        self.cancel_turn();
        if let Some(old) = self.round_gap.replace(handle) {
            old.abort();
        }
    }

    pub fn set_game_clock(&mut self, deadline: JoinHandle<()>, tick: JoinHandle<()>) {
        if let Some(old) = self.game_deadline.replace(deadline) {
            old.abort();
        }
        if let Some(old) = self.game_tick.replace(tick) {
            old.abort();
        }
    }

    /// Whether the whole-game clock is armed; restored games rearm it
    /// lazily on the first intent that touches the room.
    pub fn game_clock_armed(&self) -> bool {
        self.game_deadline.is_some()
    }

    pub fn cancel_turn(&mut self) {
        if let Some(old) = self.turn.take() {
            old.abort();
        }
    }

    /// Game over: every scheduled task dies with it.
    pub fn cancel_all(&mut self) {
        for handle in [
            self.turn.take(),
            self.trick_gap.take(),
            self.round_gap.take(),
            self.game_deadline.take(),
            self.game_tick.take(),
        ]
        .into_iter()
        .flatten()
        {
            handle.abort();
        }
    }
}

impl Drop for TimerHandles {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn sleeper() -> JoinHandle<()> {
        tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        })
    }

    #[tokio::test]
    async fn replacing_turn_aborts_previous() {
        let mut timers = TimerHandles::default();
        let first = sleeper();
        let watch = first.abort_handle();
        timers.set_turn(first);
        timers.set_turn(sleeper());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(watch.is_finished());
    }

    #[tokio::test]
    async fn cancel_all_clears_everything() {
        let mut timers = TimerHandles::default();
        timers.set_turn(sleeper());
        timers.set_trick_gap(sleeper());
        timers.set_game_clock(sleeper(), sleeper());
        assert!(timers.game_clock_armed());
        timers.cancel_all();
        assert!(!timers.game_clock_armed());
    }

    #[tokio::test]
    async fn trick_gap_cancels_turn_timer() {
        let mut timers = TimerHandles::default();
        let turn = sleeper();
        let watch = turn.abort_handle();
        timers.set_turn(turn);
        timers.set_trick_gap(sleeper());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(watch.is_finished());
    }
}
