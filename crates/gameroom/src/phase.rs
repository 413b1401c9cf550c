use rvb_cards::Street;

/// The table's hand lifecycle.
///
/// `Waiting` precedes any hand and `Settling` follows showdown; betting
/// happens only in the four street phases. Progression is strictly
/// pre-flop → flop → turn → river → showdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Waiting,
    PreFlop,
    Flop,
    Turn,
    River,
    Showdown,
    Settling,
}

impl Phase {
    /// Betting is open in this phase.
    pub fn betting(&self) -> bool {
        matches!(
            self,
            Phase::PreFlop | Phase::Flop | Phase::Turn | Phase::River
        )
    }
    /// A hand is in progress (cards are out).
    pub fn in_hand(&self) -> bool {
        !matches!(self, Phase::Waiting | Phase::Settling)
    }
    /// The street dealt on entry to this phase.
    pub fn street(&self) -> Option<Street> {
        match self {
            Phase::Flop => Some(Street::Flop),
            Phase::Turn => Some(Street::Turn),
            Phase::River => Some(Street::River),
            _ => None,
        }
    }
    /// The phase after this one's betting round closes.
    pub fn next(&self) -> Phase {
        match self {
            Phase::Waiting => Phase::PreFlop,
            Phase::PreFlop => Phase::Flop,
            Phase::Flop => Phase::Turn,
            Phase::Turn => Phase::River,
            Phase::River => Phase::Showdown,
            Phase::Showdown => Phase::Settling,
            Phase::Settling => Phase::Waiting,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Phase::Waiting => write!(f, "waiting"),
            Phase::PreFlop => write!(f, "pre_flop"),
            Phase::Flop => write!(f, "flop"),
            Phase::Turn => write!(f, "turn"),
            Phase::River => write!(f, "river"),
            Phase::Showdown => write!(f, "showdown"),
            Phase::Settling => write!(f, "settling"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streets_progress_in_order() {
        let mut phase = Phase::Waiting;
        let mut seen = Vec::new();
        for _ in 0..7 {
            phase = phase.next();
            seen.push(phase);
        }
        assert_eq!(
            seen,
            vec![
                Phase::PreFlop,
                Phase::Flop,
                Phase::Turn,
                Phase::River,
                Phase::Showdown,
                Phase::Settling,
                Phase::Waiting,
            ]
        );
    }

    #[test]
    fn betting_phases() {
        assert!(Phase::PreFlop.betting());
        assert!(Phase::River.betting());
        assert!(!Phase::Waiting.betting());
        assert!(!Phase::Showdown.betting());
        assert!(!Phase::Settling.betting());
    }
}
