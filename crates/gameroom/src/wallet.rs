use rvb_core::Chips;
use rvb_core::EscrowId;
use rvb_core::PlayerId;
use std::collections::HashMap;

/// Wallet collaborator failures.
#[derive(Debug, Clone)]
pub enum WalletError {
    InsufficientBalance,
    UnknownEscrow,
}

impl std::fmt::Display for WalletError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InsufficientBalance => write!(f, "insufficient wallet balance"),
            Self::UnknownEscrow => write!(f, "unknown escrow"),
        }
    }
}

impl std::error::Error for WalletError {}

/// The payment collaborator as the core consumes it.
///
/// A buy-in reserves chips into an escrow before the join reaches the
/// actor; leaving settles the remaining stack back. Top-ups, rails, and
/// KYC live behind this seam, outside the core.
#[async_trait::async_trait]
pub trait Wallet: Send + Sync {
    async fn reserve(&self, player: PlayerId, amount: Chips) -> Result<EscrowId, WalletError>;
    /// Closes an escrow, crediting the player with `balance`.
    async fn settle(&self, escrow: EscrowId, balance: Chips) -> Result<(), WalletError>;
    /// Cancels an untouched escrow, refunding the reserve in full.
    async fn release(&self, escrow: EscrowId) -> Result<(), WalletError>;
}

/// In-process wallet for tests and single-node play.
pub struct Bankroll {
    inner: tokio::sync::Mutex<BankrollInner>,
    grant: Chips,
}

#[derive(Default)]
struct BankrollInner {
    balances: HashMap<PlayerId, Chips>,
    escrows: HashMap<EscrowId, (PlayerId, Chips)>,
}

impl Bankroll {
    /// Every unseen player starts with `grant` chips.
    pub fn new(grant: Chips) -> Self {
        Self {
            inner: tokio::sync::Mutex::default(),
            grant,
        }
    }
    pub async fn balance(&self, player: PlayerId) -> Chips {
        let inner = self.inner.lock().await;
        *inner.balances.get(&player).unwrap_or(&self.grant)
    }
}

#[async_trait::async_trait]
impl Wallet for Bankroll {
    async fn reserve(&self, player: PlayerId, amount: Chips) -> Result<EscrowId, WalletError> {
        let mut inner = self.inner.lock().await;
        let balance = *inner.balances.get(&player).unwrap_or(&self.grant);
        if balance < amount {
            return Err(WalletError::InsufficientBalance);
        }
        inner.balances.insert(player, balance - amount);
        let escrow = EscrowId::fresh();
        inner.escrows.insert(escrow, (player, amount));
        log::debug!("[wallet] reserved {} for {}", amount, player);
        Ok(escrow)
    }
    async fn settle(&self, escrow: EscrowId, balance: Chips) -> Result<(), WalletError> {
        let mut inner = self.inner.lock().await;
        let (player, _) = inner
            .escrows
            .remove(&escrow)
            .ok_or(WalletError::UnknownEscrow)?;
        let credit = inner.balances.get(&player).copied().unwrap_or(self.grant) + balance;
        inner.balances.insert(player, credit);
        log::debug!("[wallet] settled {} back to {}", balance, player);
        Ok(())
    }
    async fn release(&self, escrow: EscrowId) -> Result<(), WalletError> {
        let mut inner = self.inner.lock().await;
        let (player, amount) = inner
            .escrows
            .remove(&escrow)
            .ok_or(WalletError::UnknownEscrow)?;
        let credit = inner.balances.get(&player).copied().unwrap_or(self.grant) + amount;
        inner.balances.insert(player, credit);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reserve_settle_roundtrip() {
        let wallet = Bankroll::new(1000);
        let player = PlayerId::fresh();
        let escrow = wallet.reserve(player, 400).await.unwrap();
        assert_eq!(wallet.balance(player).await, 600);
        // left the table with 550 after winning 150
        wallet.settle(escrow, 550).await.unwrap();
        assert_eq!(wallet.balance(player).await, 1150);
        assert!(wallet.settle(escrow, 1).await.is_err());
    }

    #[tokio::test]
    async fn reserve_checks_balance() {
        let wallet = Bankroll::new(100);
        assert!(wallet.reserve(PlayerId::fresh(), 200).await.is_err());
    }

    #[tokio::test]
    async fn release_refunds_in_full() {
        let wallet = Bankroll::new(1000);
        let player = PlayerId::fresh();
        let escrow = wallet.reserve(player, 400).await.unwrap();
        wallet.release(escrow).await.unwrap();
        assert_eq!(wallet.balance(player).await, 1000);
    }
}
