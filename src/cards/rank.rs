/// Truco rank order, weakest to strongest: 4 5 6 7 8 9 10 J Q K A 2 3.
/// The discriminant is the rank's index in that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Rank {
    Four = 0,
    Five = 1,
    Six = 2,
    Seven = 3,
    Eight = 4,
    Nine = 5,
    Ten = 6,
    Jack = 7,
    Queen = 8,
    King = 9,
    Ace = 10,
    Two = 11,
    Three = 12,
}

impl Rank {
    pub const COUNT: u8 = 13;

    /// The manilha rank for a given vira: one step up, wrapping 3 → 4.
    pub fn manilha_for(vira: Rank) -> Rank {
        Rank::from((u8::from(vira) + 1) % Self::COUNT)
    }
}

impl From<Rank> for u8 {
    fn from(r: Rank) -> u8 {
        r as u8
    }
}
impl From<u8> for Rank {
    fn from(n: u8) -> Rank {
        match n {
            0 => Rank::Four,
            1 => Rank::Five,
            2 => Rank::Six,
            3 => Rank::Seven,
            4 => Rank::Eight,
            5 => Rank::Nine,
            6 => Rank::Ten,
            7 => Rank::Jack,
            8 => Rank::Queen,
            9 => Rank::King,
            10 => Rank::Ace,
            11 => Rank::Two,
            12 => Rank::Three,
            _ => panic!("invalid rank"),
        }
    }
}

impl std::fmt::Display for Rank {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Rank::Four => "4",
                Rank::Five => "5",
                Rank::Six => "6",
                Rank::Seven => "7",
                Rank::Eight => "8",
                Rank::Nine => "9",
                Rank::Ten => "10",
                Rank::Jack => "J",
                Rank::Queen => "Q",
                Rank::King => "K",
                Rank::Ace => "A",
                Rank::Two => "2",
                Rank::Three => "3",
            }
        )
    }
}

impl std::str::FromStr for Rank {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "4" => Ok(Rank::Four),
            "5" => Ok(Rank::Five),
            "6" => Ok(Rank::Six),
            "7" => Ok(Rank::Seven),
            "8" => Ok(Rank::Eight),
            "9" => Ok(Rank::Nine),
            "10" => Ok(Rank::Ten),
            "J" | "j" => Ok(Rank::Jack),
            "Q" | "q" => Ok(Rank::Queen),
            "K" | "k" => Ok(Rank::King),
            "A" | "a" => Ok(Rank::Ace),
            "2" => Ok(Rank::Two),
            "3" => Ok(Rank::Three),
            _ => Err(format!("invalid rank: {}", s)),
        }
    }
}

impl serde::Serialize for Rank {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}
impl<'de> serde::Deserialize<'de> for Rank {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl crate::Arbitrary for Rank {
    fn random() -> Self {
        use rand::Rng;
        Rank::from(rand::rng().random_range(0..Self::COUNT))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manilha_steps_up() {
        assert_eq!(Rank::manilha_for(Rank::Jack), Rank::Queen);
        assert_eq!(Rank::manilha_for(Rank::King), Rank::Ace);
    }

    #[test]
    fn manilha_wraps() {
        assert_eq!(Rank::manilha_for(Rank::Three), Rank::Four);
    }

    #[test]
    fn bijective_u8() {
        for n in 0..Rank::COUNT {
            assert_eq!(u8::from(Rank::from(n)), n);
        }
    }

    #[test]
    fn bijective_str() {
        for n in 0..Rank::COUNT {
            let rank = Rank::from(n);
            assert_eq!(rank.to_string().parse::<Rank>(), Ok(rank));
        }
    }
}
