//! In-memory world state and the crash-safe snapshot file.
//!
//! Sessions are a lookup side-table (they own nothing); the snapshot
//! document is assembled from per-room state under short-lived locks
//! and written with write-temp-then-rename.

mod sessions;
mod snapshot;

pub use sessions::*;
pub use snapshot::*;
