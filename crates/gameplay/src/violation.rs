/// A rejected action and why.
///
/// Violations never mutate table state and are reported only to the
/// offending player. Checks run in declaration order; the first failure
/// wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleViolation {
    /// The acting player is not the one the action is on.
    NotYourTurn,
    /// No betting is possible in the table's current phase.
    WrongPhase,
    /// The action does not fit the round state: checking into a bet,
    /// calling with nothing outstanding, betting over an existing bet,
    /// raising with no bet to raise, or raising after a short all-in
    /// capped the round.
    InvalidActionForState,
    /// A raise costs more chips than the player holds.
    InsufficientFunds,
    /// The raise increment is below the current minimum.
    BelowMinRaise,
    /// A bet or raise total of zero or less.
    AmountNotPositive,
    /// An opening bet larger than the player's stack.
    AmountExceedsStack,
}

impl RuleViolation {
    /// Stable wire code for the gateway's error frames.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotYourTurn => "not_your_turn",
            Self::WrongPhase => "invalid_action",
            Self::InvalidActionForState => "invalid_action",
            Self::InsufficientFunds => "insufficient_funds",
            Self::BelowMinRaise => "below_min_raise",
            Self::AmountNotPositive => "invalid_action",
            Self::AmountExceedsStack => "insufficient_funds",
        }
    }
}

impl std::fmt::Display for RuleViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::NotYourTurn => write!(f, "it is not your turn"),
            Self::WrongPhase => write!(f, "no hand is accepting actions"),
            Self::InvalidActionForState => write!(f, "action not available in this state"),
            Self::InsufficientFunds => write!(f, "action requires more chips than the stack"),
            Self::BelowMinRaise => write!(f, "raise increment below the minimum"),
            Self::AmountNotPositive => write!(f, "amount must be positive"),
            Self::AmountExceedsStack => write!(f, "amount exceeds the stack"),
        }
    }
}

impl std::error::Error for RuleViolation {}
