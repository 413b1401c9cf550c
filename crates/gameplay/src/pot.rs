use super::seat::Seat;
use rvb_core::Chips;
use rvb_core::Position;
use std::collections::BTreeSet;

/// One layer of the pot and the seats that may win it.
///
/// The first layer is the main pot; each further layer is a side pot
/// created by an all-in below the final bet level. Eligibility sets form
/// a chain: every seat eligible for layer n+1 is eligible for layer n.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PotLayer {
    pub amount: Chips,
    pub eligible: Vec<Position>,
}

/// Computes pot layers from each seat's total commitment.
///
/// Every unique all-in commitment among contesting seats caps a layer;
/// contributions from folded seats count toward the layers they reach
/// but folded seats are never eligible. An uncalled excess bet forms a
/// final layer whose sole eligible seat is the bettor, which returns it
/// to them at settlement.
pub fn layers(seats: &[Seat]) -> Vec<PotLayer> {
    let mut caps: BTreeSet<Chips> = seats
        .iter()
        .filter(|s| s.in_hand() && s.stack == 0)
        .map(|s| s.spent)
        .collect();
    if let Some(top) = seats.iter().filter(|s| s.in_hand()).map(|s| s.spent).max() {
        caps.insert(top);
    }
    let mut pots = Vec::new();
    let mut floor: Chips = 0;
    for cap in caps.into_iter().filter(|&c| c > 0) {
        let amount = seats
            .iter()
            .map(|s| s.spent.min(cap) - s.spent.min(floor))
            .sum();
        let eligible = seats
            .iter()
            .filter(|s| s.in_hand() && s.spent >= cap)
            .map(|s| s.position)
            .collect();
        if amount > 0 {
            pots.push(PotLayer { amount, eligible });
        }
        floor = cap;
    }
    pots
}
