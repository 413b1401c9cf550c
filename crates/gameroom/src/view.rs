use super::phase::Phase;
use rvb_cards::Card;
use rvb_cards::Hole;
use rvb_core::*;
use rvb_gameplay::PotLayer;
use rvb_gameplay::Seat;
use rvb_gameplay::Status;

/// Who is looking at a piece of table state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewer {
    Player(PlayerId),
    Spectator,
}

/// One seat as shown to clients. `hole` is present only in views built
/// for the seat's owner; masking strips it for everyone else.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SeatView {
    pub position: Position,
    pub player: PlayerId,
    pub name: String,
    pub stack: Chips,
    pub bet: Chips,
    pub spent: Chips,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hole: Option<Hole>,
    pub connected: bool,
}

impl SeatView {
    pub fn of(seat: &Seat, connected: bool) -> Self {
        Self {
            position: seat.position,
            player: seat.player,
            name: seat.name.clone(),
            stack: seat.stack,
            bet: seat.bet,
            spent: seat.spent,
            status: seat.status,
            hole: seat.hole,
            connected,
        }
    }
}

/// A full table snapshot keyed by `version`.
///
/// Built unmasked inside the actor; the gateway calls [`masked_for`]
/// per recipient before anything reaches a socket.
///
/// [`masked_for`]: Self::masked_for
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GameView {
    pub table: TableId,
    pub name: String,
    pub phase: Phase,
    pub hand_number: HandNumber,
    pub button: Position,
    pub pot: Chips,
    pub bet: Chips,
    pub min_raise: Chips,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_on: Option<Position>,
    pub community: Vec<Card>,
    pub pots: Vec<PotLayer>,
    pub seats: Vec<SeatView>,
}

impl GameView {
    /// Strips every hole the viewer is not entitled to see.
    pub fn masked_for(&self, viewer: Viewer) -> Self {
        let mut view = self.clone();
        for seat in view.seats.iter_mut() {
            let owned = matches!(viewer, Viewer::Player(p) if p == seat.player);
            if !owned {
                seat.hole = None;
            }
        }
        view
    }
}

/// Lobby listing entry for one table.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TableSummary {
    pub id: TableId,
    pub name: String,
    pub small_blind: Chips,
    pub big_blind: Chips,
    pub seated: usize,
    pub max_seats: usize,
    pub phase: Phase,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view_with_holes() -> (GameView, PlayerId, PlayerId) {
        let (a, b) = (PlayerId::fresh(), PlayerId::fresh());
        let mut sa = Seat::new(0, a, "a".into(), 100);
        let mut sb = Seat::new(1, b, "b".into(), 100);
        sa.hole = Hole::try_from("AsKs").ok();
        sb.hole = Hole::try_from("QdQh").ok();
        let view = GameView {
            table: TableId::fresh(),
            name: "main".into(),
            phase: Phase::PreFlop,
            hand_number: 1,
            button: 0,
            pot: 30,
            bet: 20,
            min_raise: 20,
            action_on: Some(0),
            community: Vec::new(),
            pots: Vec::new(),
            seats: vec![SeatView::of(&sa, true), SeatView::of(&sb, true)],
        };
        (view, a, b)
    }

    #[test]
    fn players_see_only_their_own_hole() {
        let (view, a, _) = view_with_holes();
        let masked = view.masked_for(Viewer::Player(a));
        assert!(masked.seats[0].hole.is_some());
        assert!(masked.seats[1].hole.is_none());
    }

    #[test]
    fn spectators_see_no_holes() {
        let (view, _, _) = view_with_holes();
        let masked = view.masked_for(Viewer::Spectator);
        assert!(masked.seats.iter().all(|s| s.hole.is_none()));
    }
}
