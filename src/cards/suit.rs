/// Suit with its manilha strength as discriminant:
/// clubs beat hearts beat spades beat diamonds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Suit {
    Diamonds = 0,
    Spades = 1,
    Hearts = 2,
    Clubs = 3,
}

impl Suit {
    pub const COUNT: u8 = 4;

    /// Tie-break weight among manilhas. Non-manilhas ignore suit.
    pub fn strength(&self) -> u16 {
        *self as u16
    }
}

impl From<Suit> for u8 {
    fn from(s: Suit) -> u8 {
        s as u8
    }
}
impl From<u8> for Suit {
    fn from(n: u8) -> Suit {
        match n {
            0 => Suit::Diamonds,
            1 => Suit::Spades,
            2 => Suit::Hearts,
            3 => Suit::Clubs,
            _ => panic!("invalid suit"),
        }
    }
}

impl std::fmt::Display for Suit {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Suit::Diamonds => "diamonds",
                Suit::Spades => "spades",
                Suit::Hearts => "hearts",
                Suit::Clubs => "clubs",
            }
        )
    }
}

impl std::str::FromStr for Suit {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "diamonds" => Ok(Suit::Diamonds),
            "spades" => Ok(Suit::Spades),
            "hearts" => Ok(Suit::Hearts),
            "clubs" => Ok(Suit::Clubs),
            _ => Err(format!("invalid suit: {}", s)),
        }
    }
}

impl serde::Serialize for Suit {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}
impl<'de> serde::Deserialize<'de> for Suit {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl crate::Arbitrary for Suit {
    fn random() -> Self {
        use rand::Rng;
        Suit::from(rand::rng().random_range(0..Self::COUNT))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clubs_strongest() {
        assert!(Suit::Clubs.strength() > Suit::Hearts.strength());
        assert!(Suit::Hearts.strength() > Suit::Spades.strength());
        assert!(Suit::Spades.strength() > Suit::Diamonds.strength());
    }

    #[test]
    fn bijective_str() {
        for n in 0..Suit::COUNT {
            let suit = Suit::from(n);
            assert_eq!(suit.to_string().parse::<Suit>(), Ok(suit));
        }
    }
}
