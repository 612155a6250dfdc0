use super::card::Card;
use super::rank::Rank;

/// A 52-card deck. Construction gives the sorted deck; call
/// [`Deck::shuffle`] before dealing.
#[derive(Debug, Clone)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    pub fn new() -> Self {
        Self {
            cards: (0..52).map(Card::from).collect(),
        }
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Unbiased Fisher–Yates over a CSPRNG. For each i from n-1 down
    /// to 1, j is drawn uniformly in [0, i] by rejection sampling.
    pub fn shuffle(&mut self) {
        for i in (1..self.cards.len()).rev() {
            let j = uniform(i + 1);
            self.cards.swap(i, j);
        }
    }

    /// Reveals the vira (first card) and derives the manilha rank.
    /// The remainder of the deck is what gets dealt.
    pub fn draw_vira(mut self) -> (Card, Rank, Vec<Card>) {
        let vira = self.cards.remove(0);
        let manilha = Rank::manilha_for(vira.rank());
        (vira, manilha, self.cards)
    }

    /// Deals `count` cards to each of `players` hands, in seating
    /// order, consuming from the front of the deck.
    pub fn deal(cards: &mut Vec<Card>, players: usize, count: usize) -> Vec<Vec<Card>> {
        let mut hands = vec![Vec::with_capacity(count); players];
        for _ in 0..count {
            for hand in hands.iter_mut() {
                hand.push(cards.remove(0));
            }
        }
        hands
    }
}

impl Default for Deck {
    fn default() -> Self {
        Self::new()
    }
}

/// Uniform draw in [0, bound) from CSPRNG bytes.
/// Reads the fewest bytes covering `bound`, then rejects values at or
/// above the largest representable multiple of `bound`.
fn uniform(bound: usize) -> usize {
    debug_assert!(bound > 0);
    if bound == 1 {
        return 0;
    }
    let mut width = 1usize;
    let mut space = 256u64;
    while (space as u128) < bound as u128 {
        width += 1;
        space = space.saturating_mul(256);
    }
    let cutoff = space - (space % bound as u64);
    let mut buf = [0u8; 8];
    loop {
        getrandom::fill(&mut buf[..width]).expect("csprng unavailable");
        let value = buf[..width]
            .iter()
            .fold(0u64, |acc, b| (acc << 8) | *b as u64);
        if value < cutoff {
            return (value % bound as u64) as usize;
        }
    }
}

impl crate::Arbitrary for Deck {
    fn random() -> Self {
        let mut deck = Self::new();
        deck.shuffle();
        deck
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Arbitrary;
    use std::collections::HashSet;

    #[test]
    fn deck_has_52_distinct_cards() {
        let deck = Deck::new();
        let distinct: HashSet<u8> = deck.cards().iter().map(|c| u8::from(*c)).collect();
        assert_eq!(distinct.len(), 52);
    }

    #[test]
    fn shuffle_preserves_multiset() {
        let deck = Deck::random();
        let distinct: HashSet<u8> = deck.cards().iter().map(|c| u8::from(*c)).collect();
        assert_eq!(deck.len(), 52);
        assert_eq!(distinct.len(), 52);
    }

    #[test]
    fn vira_leaves_51_playable() {
        let (vira, manilha, rest) = Deck::random().draw_vira();
        assert_eq!(rest.len(), 51);
        assert_eq!(manilha, Rank::manilha_for(vira.rank()));
        assert!(!rest.contains(&vira));
    }

    #[test]
    fn deal_in_seating_order() {
        let (_, _, mut rest) = Deck::new().draw_vira();
        let first = rest[0];
        let second = rest[1];
        let hands = Deck::deal(&mut rest, 2, 3);
        assert_eq!(hands.len(), 2);
        assert!(hands.iter().all(|h| h.len() == 3));
        assert_eq!(hands[0][0], first);
        assert_eq!(hands[1][0], second);
        assert_eq!(rest.len(), 51 - 6);
    }

    #[test]
    fn uniform_stays_in_bounds() {
        for bound in 1..64 {
            for _ in 0..32 {
                assert!(uniform(bound) < bound);
            }
        }
    }
}
