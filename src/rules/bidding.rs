use crate::Bid;
use crate::state::PlayerId;
use std::collections::HashMap;

/// The legal-bid picture for one player at one moment of the bidding
/// phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BidOptions {
    pub valid: Vec<Bid>,
    pub forbidden: Option<Bid>,
    pub is_last_bidder: bool,
}

impl BidOptions {
    pub fn allows(&self, bid: Bid) -> bool {
        self.valid.contains(&bid)
    }
    /// The auto-action on timeout: the smallest legal bid.
    pub fn minimum(&self) -> Bid {
        self.valid.first().copied().unwrap_or(0)
    }
}

/// Computes the legal bids for `player`.
///
/// Every bid in [0, card_count] is legal except, for the final bidder
/// of a non-blind round, the value that would make the bid sum equal
/// the card count. The blind round carries no restriction.
pub fn bid_options(
    card_count: usize,
    order: &[PlayerId],
    player: PlayerId,
    bids: &HashMap<PlayerId, Bid>,
    blind: bool,
) -> BidOptions {
    let is_last_bidder = order
        .iter()
        .filter(|p| **p != player)
        .all(|p| bids.contains_key(p));
    let others: u64 = order
        .iter()
        .filter(|p| **p != player)
        .filter_map(|p| bids.get(p))
        .map(|b| *b as u64)
        .sum();
    let forbidden = match (blind, is_last_bidder) {
        (false, true) => (card_count as u64)
            .checked_sub(others)
            .filter(|b| *b <= card_count as u64)
            .map(|b| b as Bid),
        _ => None,
    };
    let valid = (0..=card_count as Bid)
        .filter(|b| Some(*b) != forbidden)
        .collect();
    BidOptions {
        valid,
        forbidden,
        is_last_bidder,
    }
}
