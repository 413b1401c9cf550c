use super::action::Action;
use super::seat::Seat;
use super::seat::Status;
use super::violation::RuleViolation;
use rvb_core::Chips;
use rvb_core::Position;

/// The betting state of one table: seats, button, and the live round.
///
/// This is the rule evaluator of the system and it is pure: [`apply`]
/// validates an action against the current state and returns either a
/// typed [`RuleViolation`] or the successor state. The table actor owns
/// the only mutable copy and persistence of it.
///
/// [`apply`]: Self::apply
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Game {
    seats: Vec<Seat>,
    button: Position,
    small_blind: Chips,
    big_blind: Chips,
    /// Bet to match this round, as a round total.
    bet: Chips,
    /// Minimum increment the next full raise must add.
    min_raise: Chips,
    action_on: Option<Position>,
    opener: Option<Position>,
    aggressor: Option<Position>,
}

impl Game {
    pub fn new(small_blind: Chips, big_blind: Chips) -> Self {
        Self {
            seats: Vec::new(),
            button: 0,
            small_blind,
            big_blind,
            bet: 0,
            min_raise: big_blind,
            action_on: None,
            opener: None,
            aggressor: None,
        }
    }

    pub fn seats(&self) -> &[Seat] {
        &self.seats
    }
    pub fn seat(&self, pos: Position) -> Option<&Seat> {
        self.seats.iter().find(|s| s.position == pos)
    }
    pub fn seat_mut(&mut self, pos: Position) -> Option<&mut Seat> {
        self.seats.iter_mut().find(|s| s.position == pos)
    }
    pub fn button(&self) -> Position {
        self.button
    }
    pub fn blinds(&self) -> (Chips, Chips) {
        (self.small_blind, self.big_blind)
    }
    pub fn bet(&self) -> Chips {
        self.bet
    }
    pub fn min_raise(&self) -> Chips {
        self.min_raise
    }
    pub fn action_on(&self) -> Option<Position> {
        self.action_on
    }
    pub fn opener(&self) -> Option<Position> {
        self.opener
    }
    pub fn aggressor(&self) -> Option<Position> {
        self.aggressor
    }
    /// Chips committed to the hand so far, across all seats.
    pub fn pot(&self) -> Chips {
        self.seats.iter().map(|s| s.spent).sum()
    }
    /// Seats still contesting the pot.
    pub fn remaining(&self) -> usize {
        self.seats.iter().filter(|s| s.in_hand()).count()
    }

    /// Adds a player to an empty position. Fails if taken.
    pub fn sit(&mut self, seat: Seat) -> Result<(), Seat> {
        if self.seat(seat.position).is_some() {
            return Err(seat);
        }
        self.seats.push(seat);
        self.seats.sort_by_key(|s| s.position);
        Ok(())
    }
    /// Removes a player, returning the seat for wallet settlement.
    pub fn stand(&mut self, pos: Position) -> Option<Seat> {
        let i = self.seats.iter().position(|s| s.position == pos)?;
        Some(self.seats.remove(i))
    }

    /// Seat positions strictly after `from`, in clockwise order.
    pub fn clockwise(&self, from: Position) -> Vec<Position> {
        let mut order: Vec<Position> = self.seats.iter().map(|s| s.position).collect();
        let rotate_by = order.iter().position(|&p| p > from).unwrap_or(0);
        order.rotate_left(rotate_by);
        order.retain(|&p| p != from);
        order
    }
    fn next_where<F>(&self, from: Position, pred: F) -> Option<Position>
    where
        F: Fn(&Seat) -> bool,
    {
        self.clockwise(from)
            .into_iter()
            .find(|&p| self.seat(p).map(&pred).unwrap_or(false))
    }

    /// Marks dealable seats active for a new hand and moves the button.
    /// The caller deals hole cards, then posts blinds.
    pub fn enter_hand(&mut self, button: Position) {
        for seat in self.seats.iter_mut() {
            seat.reset_for_hand();
        }
        for seat in self.seats.iter_mut() {
            if seat.dealable() {
                seat.status = Status::Active;
            }
        }
        self.button = button;
        self.bet = 0;
        self.min_raise = self.big_blind;
        self.action_on = None;
        self.opener = None;
        self.aggressor = None;
    }

    /// Posts blinds and opens the pre-flop round.
    ///
    /// Heads-up, the button posts the small blind and acts first; with
    /// more players the blinds sit clockwise after the button and action
    /// opens left of the big blind. Short stacks post what they have and
    /// enter all-in. Returns the posts as `(position, amount)`.
    pub fn post_blinds(&mut self) -> Vec<(Position, Chips)> {
        let heads_up = self.remaining() == 2;
        let button_live = self
            .seat(self.button)
            .map(Seat::in_hand)
            .unwrap_or(false);
        let sb = if heads_up && button_live {
            // heads-up the button is the small blind
            self.button
        } else {
            self.next_where(self.button, Seat::in_hand)
                .expect("hand has players")
        };
        let bb = self
            .next_where(sb, Seat::in_hand)
            .expect("hand has at least two players");
        let mut posts = Vec::new();
        for (pos, blind) in [(sb, self.small_blind), (bb, self.big_blind)] {
            let seat = self.seat_mut(pos).expect("blind seat exists");
            let amount = blind.min(seat.stack);
            seat.commit(amount);
            posts.push((pos, amount));
        }
        self.bet = self.big_blind;
        self.min_raise = self.big_blind;
        self.action_on = self.next_where(bb, Seat::can_act);
        self.opener = self.action_on;
        self.aggressor = None;
        posts
    }

    /// Resets the round for the next street. Action opens at the first
    /// live seat clockwise from the button.
    pub fn next_street(&mut self) {
        for seat in self.seats.iter_mut() {
            seat.reset_for_street();
        }
        self.bet = 0;
        self.min_raise = self.big_blind;
        self.aggressor = None;
        self.action_on = self.next_where(self.button, Seat::can_act);
        self.opener = self.action_on;
    }

    /// The betting round is over: at most one seat is contesting, or
    /// every seat in the rotation has acted at the current bet level.
    pub fn complete(&self) -> bool {
        self.remaining() <= 1
            || self
                .seats
                .iter()
                .filter(|s| s.can_act())
                .all(|s| s.acted && s.bet == self.bet)
    }

    /// Validates and applies one action, returning the successor state.
    ///
    /// Never mutates `self`; violations leave no trace and are reported
    /// only to the offender.
    pub fn apply(&self, pos: Position, action: Action) -> Result<Self, RuleViolation> {
        if self.action_on != Some(pos) {
            return Err(RuleViolation::NotYourTurn);
        }
        let mut next = self.clone();
        let seat = next.seat(pos).expect("action_on names a seat").clone();
        match action {
            Action::Fold => {
                next.seat_mut(pos).expect("seat").status = Status::Folded;
            }
            Action::Check => {
                if self.bet != seat.bet {
                    return Err(RuleViolation::InvalidActionForState);
                }
            }
            Action::Call => {
                if self.bet <= seat.bet {
                    return Err(RuleViolation::InvalidActionForState);
                }
                let cost = (self.bet - seat.bet).min(seat.stack);
                next.seat_mut(pos).expect("seat").commit(cost);
            }
            Action::Bet(to) => {
                if self.bet > 0 {
                    return Err(RuleViolation::InvalidActionForState);
                }
                if to <= 0 {
                    return Err(RuleViolation::AmountNotPositive);
                }
                if to > seat.stack {
                    return Err(RuleViolation::AmountExceedsStack);
                }
                if to < self.min_raise && to < seat.stack {
                    return Err(RuleViolation::BelowMinRaise);
                }
                next.seat_mut(pos).expect("seat").commit(to);
                next.escalate(pos, to);
            }
            Action::Raise(to) => {
                if self.bet == 0 || seat.capped {
                    return Err(RuleViolation::InvalidActionForState);
                }
                if to <= 0 {
                    return Err(RuleViolation::AmountNotPositive);
                }
                let cost = to - seat.bet;
                if cost > seat.stack {
                    return Err(RuleViolation::InsufficientFunds);
                }
                if to - self.bet < self.min_raise && cost < seat.stack {
                    return Err(RuleViolation::BelowMinRaise);
                }
                next.seat_mut(pos).expect("seat").commit(cost);
                next.escalate(pos, to);
            }
            Action::AllIn => {
                // a capped seat may shove only as a (short) call
                if seat.capped && seat.bet + seat.stack > self.bet {
                    return Err(RuleViolation::InvalidActionForState);
                }
                let to = seat.bet + seat.stack;
                next.seat_mut(pos).expect("seat").commit(seat.stack);
                if to > self.bet {
                    next.escalate(pos, to);
                }
            }
        }
        let seat = next.seat_mut(pos).expect("seat");
        seat.acted = true;
        seat.last = Some(action);
        next.advance(pos);
        Ok(next)
    }

    /// Raises the bet level to `to`. A full raise (increment at or above
    /// the minimum) resets the rotation and the minimum; a short all-in
    /// reopens only calling for seats that had already acted.
    fn escalate(&mut self, pos: Position, to: Chips) {
        let full = to - self.bet >= self.min_raise;
        log::trace!("seat {} raises to {} (full: {})", pos, to, full);
        if full {
            self.min_raise = to - self.bet;
        }
        for seat in self.seats.iter_mut() {
            if seat.position != pos && seat.can_act() {
                if full {
                    seat.capped = false;
                } else if seat.acted {
                    seat.capped = true;
                }
                seat.acted = false;
            }
        }
        self.bet = to;
        self.aggressor = Some(pos);
    }

    fn advance(&mut self, from: Position) {
        if self.complete() {
            self.action_on = None;
        } else {
            self.action_on = self.next_where(from, |s| s.can_act() && !s.acted);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pot::layers;
    use rvb_cards::Hole;
    use rvb_core::ID;

    /// Table of `stacks.len()` players dealt in with the button at 0.
    fn game(small: Chips, big: Chips, stacks: &[Chips]) -> Game {
        let mut game = Game::new(small, big);
        for (pos, &stack) in stacks.iter().enumerate() {
            game.sit(Seat::new(pos, ID::fresh(), format!("p{}", pos), stack))
                .expect("empty seat");
        }
        game.enter_hand(0);
        for pos in 0..stacks.len() {
            game.seat_mut(pos).unwrap().hole = Hole::try_from("2c3d").ok();
        }
        game.post_blinds();
        game
    }

    fn apply(game: Game, pos: Position, action: Action) -> Game {
        game.apply(pos, action).expect("legal action")
    }

    #[test]
    fn blinds_and_first_actor_three_handed() {
        let game = game(10, 20, &[1000, 1000, 1000]);
        assert_eq!(game.seat(1).unwrap().bet, 10);
        assert_eq!(game.seat(2).unwrap().bet, 20);
        assert_eq!(game.bet(), 20);
        assert_eq!(game.action_on(), Some(0));
    }

    #[test]
    fn heads_up_button_posts_small_and_acts_first() {
        let game = game(10, 20, &[1000, 1000]);
        assert_eq!(game.seat(0).unwrap().bet, 10);
        assert_eq!(game.seat(1).unwrap().bet, 20);
        assert_eq!(game.action_on(), Some(0));
    }

    #[test]
    fn heads_up_big_blind_acts_first_postflop() {
        let mut game = game(10, 20, &[1000, 1000]);
        game = apply(game, 0, Action::Call);
        game = apply(game, 1, Action::Check);
        assert!(game.complete());
        game.next_street();
        assert_eq!(game.action_on(), Some(1));
    }

    #[test]
    fn short_stack_blind_enters_all_in() {
        let game = game(10, 20, &[1000, 1000, 5]);
        let bb = game.seat(2).unwrap();
        assert_eq!(bb.bet, 5);
        assert_eq!(bb.status, Status::AllIn);
        assert_eq!(game.bet(), 20);
    }

    #[test]
    fn fold_through_ends_round() {
        // three-way: folds reach the big blind, who wins uncontested
        let mut game = game(10, 20, &[1000, 1000, 1000]);
        game = apply(game, 0, Action::Fold);
        game = apply(game, 1, Action::Fold);
        assert_eq!(game.remaining(), 1);
        assert!(game.complete());
        assert_eq!(game.action_on(), None);
        assert_eq!(game.pot(), 30);
    }

    #[test]
    fn big_blind_has_the_option() {
        let mut game = game(10, 20, &[1000, 1000, 1000]);
        game = apply(game, 0, Action::Call);
        game = apply(game, 1, Action::Call);
        assert!(!game.complete());
        assert_eq!(game.action_on(), Some(2));
        game = apply(game, 2, Action::Check);
        assert!(game.complete());
    }

    #[test]
    fn wrong_turn_is_rejected() {
        let game = game(10, 20, &[1000, 1000, 1000]);
        assert_eq!(
            game.apply(1, Action::Fold),
            Err(RuleViolation::NotYourTurn)
        );
    }

    #[test]
    fn check_into_a_bet_is_rejected() {
        let game = game(10, 20, &[1000, 1000, 1000]);
        assert_eq!(
            game.apply(0, Action::Check),
            Err(RuleViolation::InvalidActionForState)
        );
    }

    #[test]
    fn bet_over_a_bet_is_rejected() {
        let game = game(10, 20, &[1000, 1000, 1000]);
        assert_eq!(
            game.apply(0, Action::Bet(60)),
            Err(RuleViolation::InvalidActionForState)
        );
    }

    #[test]
    fn min_raise_is_enforced() {
        // open to 60 makes the increment 40: raising to 70 is short
        let mut game = game(10, 20, &[1000, 1000, 1000]);
        game = apply(game, 0, Action::Raise(60));
        assert_eq!(game.min_raise(), 40);
        assert_eq!(
            game.apply(1, Action::Raise(70)),
            Err(RuleViolation::BelowMinRaise)
        );
        assert!(game.apply(1, Action::Raise(100)).is_ok());
    }

    #[test]
    fn short_all_in_does_not_reopen_action() {
        // opener raises to 60, a 75-chip shove is short of the 40
        // increment; the caller at 60 may call or fold but not raise
        let mut game = game(10, 20, &[1000, 75, 1000]);
        game = apply(game, 0, Action::Raise(60));
        assert_eq!(
            game.apply(1, Action::Raise(70)),
            Err(RuleViolation::BelowMinRaise)
        );
        game = apply(game, 1, Action::AllIn);
        assert_eq!(game.bet(), 75);
        game = apply(game, 2, Action::Call);
        assert_eq!(game.action_on(), Some(0));
        assert_eq!(
            game.apply(0, Action::Raise(200)),
            Err(RuleViolation::InvalidActionForState)
        );
        game = apply(game, 0, Action::Call);
        assert!(game.complete());
    }

    #[test]
    fn full_raise_reopens_action() {
        let mut game = game(10, 20, &[1000, 1000, 1000]);
        game = apply(game, 0, Action::Raise(60));
        game = apply(game, 1, Action::Call);
        game = apply(game, 2, Action::Raise(140));
        // both prior actors owe a response and may re-raise
        assert_eq!(game.action_on(), Some(0));
        assert!(game.apply(0, Action::Raise(260)).is_ok());
    }

    #[test]
    fn call_beyond_stack_becomes_all_in() {
        let mut game = game(10, 20, &[1000, 50, 1000]);
        game = apply(game, 0, Action::Raise(200));
        game = apply(game, 1, Action::Call);
        let short = game.seat(1).unwrap();
        assert_eq!(short.status, Status::AllIn);
        assert_eq!(short.spent, 50);
        assert_eq!(game.bet(), 200);
    }

    #[test]
    fn raise_costing_more_than_stack_is_rejected() {
        let game = game(10, 20, &[1000, 1000, 1000]);
        assert_eq!(
            game.apply(0, Action::Raise(2000)),
            Err(RuleViolation::InsufficientFunds)
        );
    }

    #[test]
    fn non_positive_amounts_are_rejected() {
        let mut game = game(10, 20, &[1000, 1000, 1000]);
        assert_eq!(
            game.apply(0, Action::Raise(0)),
            Err(RuleViolation::AmountNotPositive)
        );
        game = apply(game, 0, Action::Call);
        game = apply(game, 1, Action::Call);
        game = apply(game, 2, Action::Check);
        game.next_street();
        assert_eq!(
            game.apply(1, Action::Bet(0)),
            Err(RuleViolation::AmountNotPositive)
        );
        assert_eq!(
            game.apply(1, Action::Bet(5000)),
            Err(RuleViolation::AmountExceedsStack)
        );
    }

    #[test]
    fn postflop_action_opens_left_of_button() {
        let mut game = game(10, 20, &[1000, 1000, 1000]);
        game = apply(game, 0, Action::Call);
        game = apply(game, 1, Action::Call);
        game = apply(game, 2, Action::Check);
        game.next_street();
        assert_eq!(game.action_on(), Some(1));
        assert_eq!(game.bet(), 0);
        assert_eq!(game.min_raise(), 20);
        assert_eq!(game.aggressor(), None);
    }

    #[test]
    fn turn_order_visits_every_live_seat() {
        let mut game = game(10, 20, &[1000, 1000, 1000, 1000]);
        let mut visited = Vec::new();
        while let Some(pos) = game.action_on() {
            visited.push(pos);
            let action = match game.seat(pos).unwrap().bet == game.bet() {
                true => Action::Check,
                false => Action::Call,
            };
            game = apply(game, pos, action);
            if visited.len() > 4 {
                break;
            }
        }
        // UTG, button, small blind, then the big blind option
        assert_eq!(visited, vec![3, 0, 1, 2]);
    }

    #[test]
    fn chips_are_conserved() {
        let mut game = game(10, 20, &[500, 300, 800]);
        game = apply(game, 0, Action::Raise(100));
        game = apply(game, 1, Action::AllIn);
        game = apply(game, 2, Action::Call);
        game = apply(game, 0, Action::Call);
        let stacks: Chips = game.seats().iter().map(|s| s.stack).sum();
        assert_eq!(stacks + game.pot(), 1600);
        let layered: Chips = layers(game.seats()).iter().map(|p| p.amount).sum();
        assert_eq!(layered, game.pot());
    }

    #[test]
    fn all_in_round_needs_no_action() {
        let mut game = game(10, 20, &[100, 100]);
        game = apply(game, 0, Action::AllIn);
        game = apply(game, 1, Action::Call);
        assert!(game.complete());
        game.next_street();
        assert_eq!(game.action_on(), None);
        assert!(game.complete());
    }
}
