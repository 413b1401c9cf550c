use rvb_core::*;
use rvb_gameplay::Action;

/// Table administration, behind the admin role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    /// Stop dealing new hands; the current hand finishes.
    Pause,
    Resume,
    Kick(PlayerId),
}

/// The table actor's inbox.
///
/// Exactly one message is processed at a time; every mutation of table
/// state happens inside that single consumer. Player identity is the
/// authenticated one the gateway attaches — nothing client-supplied.
#[derive(Debug, Clone)]
pub enum Message {
    /// Take a seat with an escrowed buy-in.
    Join {
        player: PlayerId,
        name: String,
        seat: Position,
        buy_in: Chips,
        escrow: EscrowId,
    },
    Leave {
        player: PlayerId,
    },
    /// Sit out of (or back into) upcoming deals without standing up.
    Sit {
        player: PlayerId,
        out: bool,
    },
    /// A betting action with its idempotency key.
    Act {
        player: PlayerId,
        action: Action,
        client_id: String,
    },
    Chat {
        player: PlayerId,
        text: String,
    },
    Connect {
        player: PlayerId,
        session: SessionId,
    },
    Disconnect {
        player: PlayerId,
        session: SessionId,
    },
    Reconnect {
        player: PlayerId,
        session: SessionId,
        last_seen: Version,
    },
    /// Timer wake-up; the actor checks every armed deadline.
    Tick,
    Admin(AdminCommand),
}
