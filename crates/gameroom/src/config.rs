use rvb_core::*;
use std::time::Duration;

/// Button movement after a player leaves mid-orbit.
///
/// Rooms differ here: a moving button always advances to the next
/// occupied seat, while a dead button may land on a vacated seat so no
/// player is skipped for blinds. Both are representable; the shipped
/// default is `Moving`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonRule {
    Moving,
    Dead,
}

/// What happens to a seat whose disconnect grace lapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutPolicy {
    /// Fold the hand and sit the player out.
    SitOut,
    /// Fold the hand and vacate the seat.
    StandUp,
}

/// Immutable table configuration, fixed at creation.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TableConfig {
    pub name: String,
    pub small_blind: Chips,
    pub big_blind: Chips,
    pub min_buy_in: Chips,
    pub max_buy_in: Chips,
    pub max_seats: usize,
    pub action_timeout: Duration,
    pub disconnect_grace: Duration,
    pub button_rule: ButtonRule,
    pub timeout_policy: TimeoutPolicy,
}

/// Why a table configuration was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    BadStakes,
    BadBuyInRange,
    BadSeatCount,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadStakes => write!(
                f,
                "big blind must be {}x the small blind and positive",
                BLIND_RATIO
            ),
            Self::BadBuyInRange => write!(f, "buy-in range must cover at least one big blind"),
            Self::BadSeatCount => {
                write!(f, "seats must be between {} and {}", MIN_SEATS, MAX_SEATS)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl TableConfig {
    /// A 6-max table at the given stakes with standard timings.
    pub fn standard(name: &str, small_blind: Chips, big_blind: Chips) -> Self {
        Self {
            name: name.to_string(),
            small_blind,
            big_blind,
            min_buy_in: big_blind * 20,
            max_buy_in: big_blind * 100,
            max_seats: 6,
            action_timeout: ACTION_TIMEOUT,
            disconnect_grace: DISCONNECT_GRACE,
            button_rule: ButtonRule::Moving,
            timeout_policy: TimeoutPolicy::SitOut,
        }
    }
    /// Validates stakes ratio, buy-in range, and seat bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.small_blind <= 0 || self.big_blind != self.small_blind * BLIND_RATIO {
            return Err(ConfigError::BadStakes);
        }
        if self.min_buy_in < self.big_blind || self.max_buy_in < self.min_buy_in {
            return Err(ConfigError::BadBuyInRange);
        }
        if self.max_seats < MIN_SEATS || self.max_seats > MAX_SEATS {
            return Err(ConfigError::BadSeatCount);
        }
        Ok(())
    }
    /// Buy-in acceptable at this table.
    pub fn accepts_buy_in(&self, amount: Chips) -> bool {
        amount >= self.min_buy_in && amount <= self.max_buy_in
    }
}
