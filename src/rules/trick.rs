use crate::cards::Card;
use crate::cards::Rank;
use crate::state::PlayerId;
use std::collections::HashMap;

/// Resolution of a completed trick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrickOutcome {
    pub winner: Option<PlayerId>,
    pub winning_card: Option<Card>,
    pub cancelled: Vec<Card>,
}

/// Resolves a completed trick under the round's vira.
///
/// Equal-rank groups of two or more cancel unless the rank is the
/// manilha rank (manilha strengths differ by suit, so they never
/// cancel). Among survivors the unique strength maximum wins; a tied
/// maximum cancels the tied cards and the contest recurses on the
/// strictly weaker survivors. All plays cancelling leaves the trick
/// winnerless.
pub fn resolve(plays: &[(PlayerId, Card)], vira: Rank) -> TrickOutcome {
    let manilha = Rank::manilha_for(vira);
    let mut counts: HashMap<Rank, usize> = HashMap::new();
    for (_, card) in plays.iter() {
        *counts.entry(card.rank()).or_default() += 1;
    }
    let mut cancelled = Vec::new();
    let mut survivors = Vec::new();
    for (player, card) in plays.iter() {
        if counts[&card.rank()] >= 2 && !card.is_manilha(manilha) {
            cancelled.push(*card);
        } else {
            survivors.push((*player, *card));
        }
    }
    contest(survivors, manilha, cancelled)
}

fn contest(
    survivors: Vec<(PlayerId, Card)>,
    manilha: Rank,
    mut cancelled: Vec<Card>,
) -> TrickOutcome {
    let top = match survivors.iter().map(|(_, c)| c.strength(manilha)).max() {
        Some(top) => top,
        None => {
            return TrickOutcome {
                winner: None,
                winning_card: None,
                cancelled,
            };
        }
    };
    let (tied, lower): (Vec<_>, Vec<_>) = survivors
        .into_iter()
        .partition(|(_, c)| c.strength(manilha) == top);
    match tied.as_slice() {
        [(player, card)] => TrickOutcome {
            winner: Some(*player),
            winning_card: Some(*card),
            cancelled,
        },
        // unreachable from honest dealing once same-rank naturals are
        // pre-cancelled, but injected state must still resolve
        _ => {
            cancelled.extend(tied.iter().map(|(_, c)| *c));
            contest(lower, manilha, cancelled)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::Suit;

    fn card(rank: Rank, suit: Suit) -> Card {
        Card::from((rank, suit))
    }

    fn players(n: usize) -> Vec<PlayerId> {
        (0..n).map(|_| PlayerId::default()).collect()
    }

    #[test]
    fn highest_natural_wins() {
        let p = players(2);
        let plays = vec![
            (p[0], card(Rank::Four, Suit::Clubs)),
            (p[1], card(Rank::Ace, Suit::Hearts)),
        ];
        // vira K makes A the manilha; use vira 4 so A stays natural
        let outcome = resolve(&plays, Rank::Four);
        assert_eq!(outcome.winner, Some(p[1]));
        assert_eq!(outcome.winning_card, Some(card(Rank::Ace, Suit::Hearts)));
        assert!(outcome.cancelled.is_empty());
    }

    #[test]
    fn manilha_wins_blind_round_example() {
        // vira K: manilha is A, so A♥ beats 4♣
        let p = players(2);
        let plays = vec![
            (p[0], card(Rank::Four, Suit::Clubs)),
            (p[1], card(Rank::Ace, Suit::Hearts)),
        ];
        let outcome = resolve(&plays, Rank::King);
        assert_eq!(outcome.winner, Some(p[1]));
        assert!(outcome.cancelled.is_empty());
    }

    #[test]
    fn equal_rank_naturals_cancel() {
        // vira 4 (manilha 5): two aces cancel, the 3 wins
        let p = players(3);
        let plays = vec![
            (p[0], card(Rank::Ace, Suit::Hearts)),
            (p[1], card(Rank::Ace, Suit::Clubs)),
            (p[2], card(Rank::Three, Suit::Spades)),
        ];
        let outcome = resolve(&plays, Rank::Four);
        assert_eq!(outcome.winner, Some(p[2]));
        assert_eq!(outcome.winning_card, Some(card(Rank::Three, Suit::Spades)));
        assert_eq!(
            outcome.cancelled,
            vec![card(Rank::Ace, Suit::Hearts), card(Rank::Ace, Suit::Clubs)]
        );
    }

    #[test]
    fn manilhas_never_cancel() {
        // vira J (manilha Q): Q♣ beats Q♦ by suit, 3♥ is irrelevant
        let p = players(3);
        let plays = vec![
            (p[0], card(Rank::Queen, Suit::Diamonds)),
            (p[1], card(Rank::Queen, Suit::Clubs)),
            (p[2], card(Rank::Three, Suit::Hearts)),
        ];
        let outcome = resolve(&plays, Rank::Jack);
        assert_eq!(outcome.winner, Some(p[1]));
        assert_eq!(outcome.winning_card, Some(card(Rank::Queen, Suit::Clubs)));
        assert!(outcome.cancelled.is_empty());
    }

    #[test]
    fn all_plays_cancelling_leaves_no_winner() {
        let p = players(4);
        let plays = vec![
            (p[0], card(Rank::King, Suit::Hearts)),
            (p[1], card(Rank::King, Suit::Clubs)),
            (p[2], card(Rank::Seven, Suit::Spades)),
            (p[3], card(Rank::Seven, Suit::Diamonds)),
        ];
        let outcome = resolve(&plays, Rank::Four);
        assert_eq!(outcome.winner, None);
        assert_eq!(outcome.winning_card, None);
        assert_eq!(outcome.cancelled.len(), 4);
    }

    #[test]
    fn cancellation_exposes_lower_card() {
        let p = players(3);
        let plays = vec![
            (p[0], card(Rank::Three, Suit::Hearts)),
            (p[1], card(Rank::Three, Suit::Clubs)),
            (p[2], card(Rank::Four, Suit::Spades)),
        ];
        let outcome = resolve(&plays, Rank::Five);
        assert_eq!(outcome.winner, Some(p[2]));
        assert_eq!(outcome.cancelled.len(), 2);
    }

    #[test]
    fn injected_top_tie_recurses_to_lower() {
        // not reachable from a real deal; drive the defensive branch
        // directly with a fabricated survivor set
        let p = players(3);
        let manilha = Rank::Five;
        let survivors = vec![
            (p[0], card(Rank::Ace, Suit::Hearts)),
            (p[1], card(Rank::Ace, Suit::Clubs)),
            (p[2], card(Rank::King, Suit::Spades)),
        ];
        let outcome = super::contest(survivors, manilha, Vec::new());
        assert_eq!(outcome.winner, Some(p[2]));
        assert_eq!(outcome.winning_card, Some(card(Rank::King, Suit::Spades)));
        assert_eq!(outcome.cancelled.len(), 2);
    }
}
