use super::rank::Rank;

/// A hand's category, ordered weakest to strongest.
///
/// Variants carry the rank(s) defining the category; kicker cards break
/// remaining ties and live in [`Kickers`](super::kicks::Kickers).
#[derive(Debug, Clone, Copy, Eq, PartialEq, PartialOrd, Ord)]
pub enum Ranking {
    HighCard(Rank),        // 4 kickers
    OnePair(Rank),         // 3 kickers
    TwoPair(Rank, Rank),   // 1 kicker
    Trips(Rank),           // 2 kickers
    Straight(Rank),        // 0 kickers
    Flush(Rank),           // 4 kickers (remaining flush ranks)
    FullHouse(Rank, Rank), // 0 kickers
    Quads(Rank),           // 1 kicker
    StraightFlush(Rank),   // 0 kickers
}

impl Ranking {
    /// How many kicker ranks participate in tie-breaking.
    pub fn n_kickers(&self) -> usize {
        match self {
            Ranking::HighCard(_) | Ranking::Flush(_) => 4,
            Ranking::OnePair(_) => 3,
            Ranking::Trips(_) => 2,
            Ranking::Quads(_) | Ranking::TwoPair(_, _) => 1,
            _ => 0,
        }
    }
}

impl std::fmt::Display for Ranking {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Ranking::HighCard(r) => write!(f, "high card {}", r),
            Ranking::OnePair(r) => write!(f, "pair of {}s", r),
            Ranking::TwoPair(hi, lo) => write!(f, "two pair {}s and {}s", hi, lo),
            Ranking::Trips(r) => write!(f, "three of a kind {}s", r),
            Ranking::Straight(r) => write!(f, "straight to {}", r),
            Ranking::Flush(r) => write!(f, "flush {} high", r),
            Ranking::FullHouse(t, p) => write!(f, "{}s full of {}s", t, p),
            Ranking::Quads(r) => write!(f, "four of a kind {}s", r),
            Ranking::StraightFlush(r) => write!(f, "straight flush to {}", r),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_ordered_by_strength() {
        assert!(Ranking::StraightFlush(Rank::Five) > Ranking::Quads(Rank::Ace));
        assert!(Ranking::Quads(Rank::Two) > Ranking::FullHouse(Rank::Ace, Rank::King));
        assert!(Ranking::FullHouse(Rank::Two, Rank::Three) > Ranking::Flush(Rank::Ace));
        assert!(Ranking::Flush(Rank::Seven) > Ranking::Straight(Rank::Ace));
        assert!(Ranking::Straight(Rank::Five) > Ranking::Trips(Rank::Ace));
        assert!(Ranking::Trips(Rank::Two) > Ranking::TwoPair(Rank::Ace, Rank::King));
        assert!(Ranking::TwoPair(Rank::Three, Rank::Two) > Ranking::OnePair(Rank::Ace));
        assert!(Ranking::OnePair(Rank::Two) > Ranking::HighCard(Rank::Ace));
    }

    #[test]
    fn same_category_ordered_by_rank() {
        assert!(Ranking::OnePair(Rank::Ace) > Ranking::OnePair(Rank::King));
        assert!(
            Ranking::TwoPair(Rank::Ace, Rank::Three) > Ranking::TwoPair(Rank::King, Rank::Queen)
        );
    }
}
