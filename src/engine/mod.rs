//! The authoritative per-room game state machine.
//!
//! Every mutation happens under the owning room's lock, driven by the
//! dispatch layer. Engine entry points validate fully before touching
//! state, mutate, and return the [`Effect`] list for the dispatch
//! layer to interpret (fan out messages, arm timers). Timer callbacks
//! re-enter through the same entry points carrying the turn serial
//! they were armed with; a stale serial makes the callback a no-op,
//! which is what resolves timer/intent races.

mod effect;
mod flow;

pub use effect::*;
pub use flow::*;
