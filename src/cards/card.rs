use super::rank::Rank;
use super::suit::Suit;
use serde::Deserialize;
use serde::Serialize;

/// A playing card: a (Rank, Suit) pair.
/// Strength is only meaningful relative to a round's manilha rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    rank: Rank,
    suit: Suit,
}

impl Card {
    pub fn rank(&self) -> Rank {
        self.rank
    }
    pub fn suit(&self) -> Suit {
        self.suit
    }
    /// Strength independent of the vira: rank index + 1.
    pub fn base_strength(&self) -> u16 {
        u8::from(self.rank) as u16 + 1
    }
    /// Strength given the round's manilha rank. Manilhas jump above
    /// every natural card and tie-break by suit; equal strengths are
    /// possible only between non-manilhas of equal rank.
    pub fn strength(&self, manilha: Rank) -> u16 {
        if self.rank == manilha {
            self.base_strength() + 100 + self.suit.strength()
        } else {
            self.base_strength()
        }
    }
    pub fn is_manilha(&self, manilha: Rank) -> bool {
        self.rank == manilha
    }
}

/// Sign of the strength difference under the given vira.
pub fn compare(a: &Card, b: &Card, vira: Rank) -> std::cmp::Ordering {
    let manilha = Rank::manilha_for(vira);
    a.strength(manilha).cmp(&b.strength(manilha))
}

/// (Rank, Suit) isomorphism
impl From<(Rank, Suit)> for Card {
    fn from((rank, suit): (Rank, Suit)) -> Self {
        Self { rank, suit }
    }
}

/// u8 isomorphism
/// each card is mapped to its location in a sorted deck 0-51
impl From<Card> for u8 {
    fn from(c: Card) -> u8 {
        u8::from(c.rank) * Suit::COUNT + u8::from(c.suit)
    }
}
impl From<u8> for Card {
    fn from(n: u8) -> Self {
        Self {
            rank: Rank::from(n / Suit::COUNT),
            suit: Suit::from(n % Suit::COUNT),
        }
    }
}

impl std::fmt::Display for Card {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} of {}", self.rank, self.suit)
    }
}

impl crate::Arbitrary for Card {
    fn random() -> Self {
        use rand::Rng;
        Card::from(rand::rng().random_range(0..52) as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Arbitrary;

    #[test]
    fn bijective_u8() {
        for n in 0..52u8 {
            assert_eq!(u8::from(Card::from(n)), n);
        }
    }

    #[test]
    fn bijective_rank_suit() {
        let card = Card::random();
        assert_eq!(card, Card::from((card.rank(), card.suit())));
    }

    #[test]
    fn base_strength_follows_rank_order() {
        let four = Card::from((Rank::Four, Suit::Clubs));
        let three = Card::from((Rank::Three, Suit::Diamonds));
        assert_eq!(four.base_strength(), 1);
        assert_eq!(three.base_strength(), 13);
    }

    #[test]
    fn manilha_beats_every_natural() {
        // vira J makes Q the manilha
        let vira = Rank::Jack;
        let manilha = Card::from((Rank::Queen, Suit::Diamonds));
        let strongest_natural = Card::from((Rank::Three, Suit::Clubs));
        assert_eq!(
            compare(&manilha, &strongest_natural, vira),
            std::cmp::Ordering::Greater
        );
    }

    #[test]
    fn manilhas_tie_break_by_suit() {
        let vira = Rank::Jack;
        let clubs = Card::from((Rank::Queen, Suit::Clubs));
        let diamonds = Card::from((Rank::Queen, Suit::Diamonds));
        assert_eq!(compare(&clubs, &diamonds, vira), std::cmp::Ordering::Greater);
    }

    #[test]
    fn equal_rank_naturals_tie() {
        let vira = Rank::Four; // manilha is 5
        let hearts = Card::from((Rank::Ace, Suit::Hearts));
        let clubs = Card::from((Rank::Ace, Suit::Clubs));
        assert_eq!(compare(&hearts, &clubs, vira), std::cmp::Ordering::Equal);
    }

    #[test]
    fn strictly_total_over_full_deck() {
        // for any vira, the 4 manilhas are pairwise distinct and above
        // all 48 naturals
        for v in 0..13u8 {
            let vira = Rank::from(v);
            let manilha = Rank::manilha_for(vira);
            let mut strengths: Vec<u16> = (0..52u8)
                .map(Card::from)
                .filter(|c| c.is_manilha(manilha))
                .map(|c| c.strength(manilha))
                .collect();
            strengths.sort_unstable();
            strengths.dedup();
            assert_eq!(strengths.len(), 4);
            let natural_max = (0..52u8)
                .map(Card::from)
                .filter(|c| !c.is_manilha(manilha))
                .map(|c| c.strength(manilha))
                .max()
                .expect("naturals");
            assert!(strengths.iter().all(|s| *s > natural_max));
        }
    }
}
