use super::kicks::Kickers;
use super::rank::Rank;
use super::ranking::Ranking;
use super::set::CardSet;
use super::suit::Suit;

/// Rank mask of the wheel straight: A-2-3-4-5.
const WHEEL: u16 = 0b1_0000_0000_1111;

/// Finds the best 5-card category inside a 5..7 card set.
///
/// Works on the bitset projections of [`CardSet`]: a 13-bit rank mask,
/// per-suit rank masks, and per-rank counts. Categories are searched in
/// descending strength order, so the first hit is the hand's value.
pub struct Evaluator(CardSet);

impl From<CardSet> for Evaluator {
    fn from(set: CardSet) -> Self {
        Self(set)
    }
}

impl Evaluator {
    pub fn ranking(&self) -> Ranking {
        None.or_else(|| self.straight_flush())
            .or_else(|| self.quads())
            .or_else(|| self.full_house())
            .or_else(|| self.flush())
            .or_else(|| self.straight())
            .or_else(|| self.trips())
            .or_else(|| self.two_pair())
            .or_else(|| self.one_pair())
            .or_else(|| self.high_card())
            .expect("at least one card in set")
    }
    /// Kicker ranks for the given category, best-first up to its arity.
    pub fn kickers(&self, ranking: Ranking) -> Kickers {
        let n = ranking.n_kickers();
        if n == 0 {
            return Kickers::default();
        }
        let candidates = match ranking {
            // flush kickers come from the flush suit only
            Ranking::Flush(hi) => {
                let suit = self.flush_suit().expect("flush implies a 5-card suit");
                self.0.ranks_of(suit) & !u16::from(hi)
            }
            Ranking::TwoPair(hi, lo) => self.0.ranks() & !u16::from(hi) & !u16::from(lo),
            Ranking::HighCard(hi)
            | Ranking::OnePair(hi)
            | Ranking::Trips(hi)
            | Ranking::Quads(hi) => self.0.ranks() & !u16::from(hi),
            _ => unreachable!("categories without kickers return early"),
        };
        Kickers::from(top_bits(candidates, n))
    }

    fn straight_flush(&self) -> Option<Ranking> {
        self.flush_suit()
            .and_then(|suit| straight_top(self.0.ranks_of(suit)))
            .map(Ranking::StraightFlush)
    }
    fn quads(&self) -> Option<Ranking> {
        self.n_of_a_kind(4, 0).map(Ranking::Quads)
    }
    fn full_house(&self) -> Option<Ranking> {
        self.n_of_a_kind(3, 0).and_then(|trips| {
            self.n_of_a_kind(2, u16::from(trips))
                .map(|pair| Ranking::FullHouse(trips, pair))
        })
    }
    fn flush(&self) -> Option<Ranking> {
        self.flush_suit()
            .map(|suit| Ranking::Flush(Rank::from(self.0.ranks_of(suit))))
    }
    fn straight(&self) -> Option<Ranking> {
        straight_top(self.0.ranks()).map(Ranking::Straight)
    }
    fn trips(&self) -> Option<Ranking> {
        self.n_of_a_kind(3, 0).map(Ranking::Trips)
    }
    fn two_pair(&self) -> Option<Ranking> {
        self.n_of_a_kind(2, 0).and_then(|hi| {
            self.n_of_a_kind(2, u16::from(hi))
                .map(|lo| Ranking::TwoPair(hi, lo))
        })
    }
    fn one_pair(&self) -> Option<Ranking> {
        self.n_of_a_kind(2, 0).map(Ranking::OnePair)
    }
    fn high_card(&self) -> Option<Ranking> {
        self.n_of_a_kind(1, 0).map(Ranking::HighCard)
    }

    /// Highest rank appearing at least n times, skipping excluded ranks.
    fn n_of_a_kind(&self, n: usize, excluded: u16) -> Option<Rank> {
        (0..Rank::COUNT as u8)
            .rev()
            .map(Rank::from)
            .filter(|r| excluded & u16::from(*r) == 0)
            .find(|r| self.0.count_of(*r) >= n)
    }
    fn flush_suit(&self) -> Option<Suit> {
        Suit::all().find(|s| self.0.ranks_of(*s).count_ones() >= 5)
    }
}

/// Top card of the best straight in a rank mask, wheel included.
fn straight_top(mask: u16) -> Option<Rank> {
    let mut bits = mask;
    bits &= bits << 1;
    bits &= bits << 1;
    bits &= bits << 1;
    bits &= bits << 1;
    if bits > 0 {
        Some(Rank::from(bits))
    } else if mask & WHEEL == WHEEL {
        Some(Rank::Five)
    } else {
        None
    }
}

/// Keeps only the highest n set bits of a rank mask.
fn top_bits(mask: u16, n: usize) -> u16 {
    let mut bits = mask;
    while bits.count_ones() as usize > n {
        bits &= !(1 << bits.trailing_zeros());
    }
    bits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::Card;

    fn ranking(s: &str) -> Ranking {
        Evaluator::from(CardSet::from(Card::parse(s).unwrap())).ranking()
    }

    #[test]
    fn high_card() {
        assert_eq!(ranking("AsKhQdJc9s"), Ranking::HighCard(Rank::Ace));
    }

    #[test]
    fn one_pair() {
        assert_eq!(ranking("AsAhKdQcJs"), Ranking::OnePair(Rank::Ace));
    }

    #[test]
    fn two_pair() {
        assert_eq!(ranking("AsAhKdKcQs"), Ranking::TwoPair(Rank::Ace, Rank::King));
    }

    #[test]
    fn trips() {
        assert_eq!(ranking("AsAhAdKcQs"), Ranking::Trips(Rank::Ace));
    }

    #[test]
    fn straight() {
        assert_eq!(ranking("TsJhQdKcAs"), Ranking::Straight(Rank::Ace));
    }

    #[test]
    fn wheel_straight() {
        assert_eq!(ranking("As2h3d4c5s"), Ranking::Straight(Rank::Five));
    }

    #[test]
    fn flush() {
        assert_eq!(ranking("AsKsQsJs9s"), Ranking::Flush(Rank::Ace));
    }

    #[test]
    fn full_house() {
        assert_eq!(
            ranking("AsAhAdKcKs"),
            Ranking::FullHouse(Rank::Ace, Rank::King)
        );
    }

    #[test]
    fn full_house_pair_above_trips() {
        assert_eq!(
            ranking("5s5h5dKcKs"),
            Ranking::FullHouse(Rank::Five, Rank::King)
        );
    }

    #[test]
    fn quads() {
        assert_eq!(ranking("AsAhAdAcKs"), Ranking::Quads(Rank::Ace));
    }

    #[test]
    fn straight_flush() {
        assert_eq!(ranking("TsJsQsKsAs"), Ranking::StraightFlush(Rank::Ace));
    }

    #[test]
    fn wheel_straight_flush() {
        assert_eq!(ranking("As2s3s4s5s"), Ranking::StraightFlush(Rank::Five));
    }

    #[test]
    fn seven_cards_take_best_five() {
        assert_eq!(
            ranking("AsAhKdKcQsJh9d"),
            Ranking::TwoPair(Rank::Ace, Rank::King)
        );
    }

    #[test]
    fn flush_beats_straight() {
        assert_eq!(ranking("4h6h7h8h9hTs"), Ranking::Flush(Rank::Nine));
    }

    #[test]
    fn full_house_beats_flush() {
        assert_eq!(
            ranking("AsAhAdKsKhQsJs"),
            Ranking::FullHouse(Rank::Ace, Rank::King)
        );
    }

    #[test]
    fn two_trips_make_full_house() {
        assert_eq!(
            ranking("AsAhAdKcKsKhQd"),
            Ranking::FullHouse(Rank::Ace, Rank::King)
        );
    }

    #[test]
    fn quads_beat_full_house() {
        assert_eq!(ranking("AsAhAdAcKsKhQd"), Ranking::Quads(Rank::Ace));
    }

    #[test]
    fn straight_flush_beats_quads() {
        assert_eq!(
            ranking("TsJsQsKsAsAhAd"),
            Ranking::StraightFlush(Rank::Ace)
        );
    }

    #[test]
    fn six_card_straight_takes_top() {
        assert_eq!(ranking("As2s3h4d5c6s"), Ranking::Straight(Rank::Six));
    }

    #[test]
    fn three_pairs_take_top_two() {
        assert_eq!(
            ranking("AsAhKdKcQsQhJd"),
            Ranking::TwoPair(Rank::Ace, Rank::King)
        );
    }

    #[test]
    fn pair_kickers_are_top_three_others() {
        let eval = Evaluator::from(CardSet::from(Card::parse("AsAhKdQc9s3h2d").unwrap()));
        let ranking = eval.ranking();
        let kicks = eval.kickers(ranking);
        assert_eq!(kicks.ranks(), vec![Rank::King, Rank::Queen, Rank::Nine]);
    }

    #[test]
    fn flush_kickers_stay_in_suit() {
        // the Ah outranks every spade kicker but is not part of the flush
        let eval = Evaluator::from(CardSet::from(Card::parse("Ks9s7s5s3sAh2d").unwrap()));
        let ranking = eval.ranking();
        assert_eq!(ranking, Ranking::Flush(Rank::King));
        assert_eq!(
            eval.kickers(ranking).ranks(),
            vec![Rank::Nine, Rank::Seven, Rank::Five, Rank::Three]
        );
    }
}
