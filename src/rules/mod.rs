//! Round rules: bid legality, trick resolution, round scoring.
//!
//! Pure functions over plays and bids; the engine owns sequencing.

mod bidding;
mod scoring;
mod trick;

pub use bidding::*;
pub use scoring::*;
pub use trick::*;
