//! Intent dispatch: the imperative shell around the engine.
//!
//! One [`World`] owns every room cell (state + fan-out + timers,
//! behind one lock per room) and the global session table. Socket
//! handlers and timer callbacks funnel through here; each call locks
//! exactly one room, sweeps expired sessions, applies the mutation,
//! and interprets the resulting effects.

mod world;

pub use world::*;
