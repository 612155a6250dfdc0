//! Session and room membership: join, leave, disconnect, reconnect,
//! host election, and the expiry sweep. Sequencing rules live here;
//! the entities themselves are in [`crate::state`].

mod manager;

pub use manager::*;
