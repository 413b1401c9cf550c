use rvb_core::Chips;

/// A player's betting decision.
///
/// `Bet` and `Raise` carry round totals: `Raise(60)` means "make my bet
/// this round 60", not "add 60". This keeps the min-raise arithmetic in
/// one place and matches how clients announce raises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", content = "amount", rename_all = "snake_case")]
pub enum Action {
    Fold,
    Check,
    Call,
    Bet(Chips),
    Raise(Chips),
    AllIn,
}

impl Action {
    /// True for actions that open or increase the bet.
    pub fn is_aggressive(&self) -> bool {
        matches!(self, Action::Bet(_) | Action::Raise(_) | Action::AllIn)
    }
    /// The round total this action names, if it names one.
    pub fn amount(&self) -> Option<Chips> {
        match *self {
            Action::Bet(n) | Action::Raise(n) => Some(n),
            _ => None,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Action::Fold => write!(f, "fold"),
            Action::Check => write!(f, "check"),
            Action::Call => write!(f, "call"),
            Action::Bet(n) => write!(f, "bet {}", n),
            Action::Raise(n) => write!(f, "raise {}", n),
            Action::AllIn => write!(f, "all-in"),
        }
    }
}

impl TryFrom<&str> for Action {
    type Error = &'static str;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        let parts: Vec<&str> = s.split_whitespace().collect();
        match parts.first().map(|p| p.to_lowercase()).as_deref() {
            Some("fold") => Ok(Action::Fold),
            Some("check") => Ok(Action::Check),
            Some("call") => Ok(Action::Call),
            Some("all-in") | Some("allin") => Ok(Action::AllIn),
            Some("bet") => parts
                .get(1)
                .and_then(|n| n.parse().ok())
                .map(Action::Bet)
                .ok_or("invalid bet amount"),
            Some("raise") => parts
                .get(1)
                .and_then(|n| n.parse().ok())
                .map(Action::Raise)
                .ok_or("invalid raise amount"),
            _ => Err("invalid action"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_strings() {
        assert_eq!(Action::try_from("fold"), Ok(Action::Fold));
        assert_eq!(Action::try_from("bet 60"), Ok(Action::Bet(60)));
        assert_eq!(Action::try_from("raise 120"), Ok(Action::Raise(120)));
        assert_eq!(Action::try_from("all-in"), Ok(Action::AllIn));
        assert!(Action::try_from("bet").is_err());
        assert!(Action::try_from("limp").is_err());
    }

    #[test]
    fn roundtrips_serde() {
        for action in [Action::Fold, Action::Call, Action::Raise(40), Action::AllIn] {
            let json = serde_json::to_string(&action).unwrap();
            assert_eq!(serde_json::from_str::<Action>(&json).unwrap(), action);
        }
    }
}
