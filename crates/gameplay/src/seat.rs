use super::action::Action;
use rvb_cards::Hole;
use rvb_core::Chips;
use rvb_core::PlayerId;
use rvb_core::Position;

/// A player's standing in the current hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Seated, no hand in progress or not dealt in.
    Seated,
    /// Dealt in and able to act.
    Active,
    /// Out of the current hand.
    Folded,
    /// Committed the whole stack; in the hand but out of the rotation.
    AllIn,
    /// Keeping the seat but skipping deals.
    SittingOut,
    /// In the hand with a dropped connection; folds when grace lapses.
    Disconnected,
}

/// One occupied seat: a player's stack, commitment, and hand standing.
///
/// `bet` accumulates within the current betting round, `spent` across the
/// whole hand; `bet` rolls to zero between streets while `spent` is what
/// pot layering reads. `capped` marks a seat that already acted at the
/// current level and then faced a short all-in, which may call or fold
/// but not re-raise.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Seat {
    pub position: Position,
    pub player: PlayerId,
    pub name: String,
    pub stack: Chips,
    pub bet: Chips,
    pub spent: Chips,
    pub status: Status,
    pub hole: Option<Hole>,
    pub acted: bool,
    pub capped: bool,
    pub last: Option<Action>,
    /// Timeout preference: check when legal instead of folding.
    pub check_fold: bool,
}

impl Seat {
    pub fn new(position: Position, player: PlayerId, name: String, stack: Chips) -> Self {
        Self {
            position,
            player,
            name,
            stack,
            bet: 0,
            spent: 0,
            status: Status::Seated,
            hole: None,
            acted: false,
            capped: false,
            last: None,
            check_fold: false,
        }
    }
    /// Still contesting the pot.
    pub fn in_hand(&self) -> bool {
        self.hole.is_some()
            && matches!(
                self.status,
                Status::Active | Status::AllIn | Status::Disconnected
            )
    }
    /// In the betting rotation: contesting and not all-in.
    pub fn can_act(&self) -> bool {
        self.in_hand() && self.status != Status::AllIn
    }
    /// Eligible to be dealt into the next hand.
    pub fn dealable(&self) -> bool {
        self.stack > 0
            && matches!(
                self.status,
                Status::Seated | Status::Active | Status::Folded | Status::AllIn
            )
    }
    /// Moves chips from stack into the current bet, entering all-in when
    /// the stack empties.
    pub fn commit(&mut self, amount: Chips) {
        debug_assert!(amount <= self.stack);
        self.stack -= amount;
        self.bet += amount;
        self.spent += amount;
        if self.stack == 0 {
            self.status = Status::AllIn;
        }
    }
    /// Resets per-hand fields for a fresh deal.
    pub fn reset_for_hand(&mut self) {
        self.bet = 0;
        self.spent = 0;
        self.hole = None;
        self.acted = false;
        self.capped = false;
        self.last = None;
        if matches!(self.status, Status::Active | Status::Folded | Status::AllIn) {
            self.status = Status::Seated;
        }
    }
    /// Resets per-round fields between streets.
    pub fn reset_for_street(&mut self) {
        self.bet = 0;
        self.acted = false;
        self.capped = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rvb_core::ID;

    #[test]
    fn commit_enters_all_in_at_zero() {
        let mut seat = Seat::new(0, ID::fresh(), "a".into(), 100);
        seat.status = Status::Active;
        seat.hole = Hole::try_from("AsKd").ok();
        seat.commit(40);
        assert_eq!(seat.stack, 60);
        assert_eq!(seat.status, Status::Active);
        seat.commit(60);
        assert_eq!(seat.status, Status::AllIn);
        assert_eq!(seat.spent, 100);
        assert!(seat.in_hand());
        assert!(!seat.can_act());
    }

    #[test]
    fn sitting_out_is_not_dealable() {
        let mut seat = Seat::new(0, ID::fresh(), "a".into(), 100);
        seat.status = Status::SittingOut;
        assert!(!seat.dealable());
        seat.status = Status::Seated;
        assert!(seat.dealable());
        seat.stack = 0;
        assert!(!seat.dealable());
    }
}
