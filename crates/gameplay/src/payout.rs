use super::pot::PotLayer;
use super::pot::layers;
use super::seat::Seat;
use rvb_core::Chips;
use rvb_core::Position;
use std::collections::BTreeMap;

use rvb_cards::Card;
use rvb_cards::Strength;

/// A settled pot layer: who was eligible, who won, and each share.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PotResult {
    pub amount: Chips,
    pub eligible: Vec<Position>,
    pub winners: Vec<Position>,
    pub shares: Vec<(Position, Chips)>,
}

/// Settles every pot layer at hand end.
///
/// With one contesting seat (everyone else folded) all layers pay that
/// seat without evaluation. Otherwise each seat's 7 cards are ranked and
/// every layer is split among its strongest eligible seats. Odd chips go
/// to winners in clockwise order from the button's left.
pub fn settle(seats: &[Seat], board: &[Card], button: Position) -> Vec<PotResult> {
    let strengths = rank(seats, board);
    layers(seats)
        .into_iter()
        .map(|pot| split(pot, &strengths, seats, button))
        .collect()
}

/// Total winnings per seat across all settled layers.
pub fn rewards(results: &[PotResult]) -> Vec<(Position, Chips)> {
    let mut totals: BTreeMap<Position, Chips> = BTreeMap::new();
    for result in results {
        for &(pos, chips) in &result.shares {
            *totals.entry(pos).or_default() += chips;
        }
    }
    totals.into_iter().collect()
}

fn rank(seats: &[Seat], board: &[Card]) -> BTreeMap<Position, Strength> {
    seats
        .iter()
        .filter(|s| s.in_hand())
        .filter_map(|s| {
            s.hole.map(|hole| {
                let mut cards = hole.cards().to_vec();
                cards.extend_from_slice(board);
                (s.position, Strength::evaluate(&cards))
            })
        })
        .collect()
}

fn split(
    pot: PotLayer,
    strengths: &BTreeMap<Position, Strength>,
    seats: &[Seat],
    button: Position,
) -> PotResult {
    let contested = seats.iter().filter(|s| s.in_hand()).count() > 1;
    let winners: Vec<Position> = if contested {
        let best = pot
            .eligible
            .iter()
            .filter_map(|p| strengths.get(p))
            .max()
            .copied();
        pot.eligible
            .iter()
            .filter(|p| strengths.get(p) == best.as_ref())
            .copied()
            .collect()
    } else {
        pot.eligible.clone()
    };
    let shares = share(pot.amount, &winners, seats, button);
    PotResult {
        amount: pot.amount,
        eligible: pot.eligible,
        winners,
        shares,
    }
}

/// Splits an amount evenly; odd chips go one each to the winners closest
/// to the button clockwise.
fn share(
    amount: Chips,
    winners: &[Position],
    seats: &[Seat],
    button: Position,
) -> Vec<(Position, Chips)> {
    if winners.is_empty() {
        return Vec::new();
    }
    let n = winners.len() as Chips;
    let each = amount / n;
    let mut odd = amount % n;
    let mut order: Vec<Position> = seats.iter().map(|s| s.position).collect();
    let rotate_by = order.iter().position(|&p| p > button).unwrap_or(0);
    order.rotate_left(rotate_by);
    order.retain(|p| winners.contains(p));
    order
        .into_iter()
        .map(|pos| {
            let bonus = if odd > 0 {
                odd -= 1;
                1
            } else {
                0
            };
            (pos, each + bonus)
        })
        .collect()
}
