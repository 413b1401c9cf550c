use super::card::Card;
use super::evaluator::Evaluator;
use super::kicks::Kickers;
use super::ranking::Ranking;
use super::set::CardSet;

/// A hand's evaluated strength: category plus kicker tie-break.
///
/// Totally ordered; two strengths compare equal exactly when the hands
/// split a pot. Construct from any 5..7 card set.
#[derive(Debug, Clone, Copy, Eq, PartialEq, PartialOrd, Ord)]
pub struct Strength {
    ranking: Ranking,
    kickers: Kickers,
}

impl Strength {
    pub fn ranking(&self) -> Ranking {
        self.ranking
    }
    pub fn kickers(&self) -> Kickers {
        self.kickers
    }
    /// Evaluates the best 5-card hand inside the given cards.
    pub fn evaluate(cards: &[Card]) -> Self {
        Self::from(CardSet::from(cards))
    }
}

impl From<CardSet> for Strength {
    fn from(set: CardSet) -> Self {
        let evaluator = Evaluator::from(set);
        let ranking = evaluator.ranking();
        let kickers = evaluator.kickers(ranking);
        Self { ranking, kickers }
    }
}

impl From<(Ranking, Kickers)> for Strength {
    fn from((ranking, kickers): (Ranking, Kickers)) -> Self {
        Self { ranking, kickers }
    }
}

impl std::fmt::Display for Strength {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if self.kickers.is_empty() {
            write!(f, "{}", self.ranking)
        } else {
            write!(f, "{}, kickers {}", self.ranking, self.kickers)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strength(s: &str) -> Strength {
        Strength::evaluate(&Card::parse(s).unwrap())
    }

    #[test]
    fn category_dominates_kickers() {
        assert!(strength("2s2h3d4c5s") > strength("AsKhQdJc9s"));
    }

    #[test]
    fn kickers_break_ties() {
        // both hold a pair of aces; king kicker beats queen kicker
        assert!(strength("AsAhKd8c5s") > strength("AcAdQh8d5h"));
    }

    #[test]
    fn identical_hands_split() {
        assert_eq!(strength("AsAhKd8c5s"), strength("AcAdKh8d5h"));
    }

    #[test]
    fn board_plays_over_board() {
        // A-high vs pair of queens vs pair of twos on a dry board
        let board = "9s5h2s8c3d";
        let a = strength(&format!("AsKs{}", board));
        let b = strength(&format!("QhQd{}", board));
        let c = strength(&format!("7c2d{}", board));
        assert!(b > c);
        assert!(c > a);
        assert_eq!(b.ranking(), Ranking::OnePair(crate::rank::Rank::Queen));
    }
}
