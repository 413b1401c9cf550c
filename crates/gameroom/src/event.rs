use super::phase::Phase;
use super::view::GameView;
use super::view::SeatView;
use rvb_cards::Card;
use rvb_cards::Hole;
use rvb_cards::Street;
use rvb_core::*;
use rvb_gameplay::PotResult;
use std::time::Duration;

/// Who an outbound event is addressed to.
///
/// The gateway resolves the audience against its session registry and
/// applies per-recipient view masks; the actor never sees a socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Audience {
    /// Players and spectators at the table.
    Table,
    /// One player only.
    Player(PlayerId),
    /// Everyone at the table except one player.
    TableExcept(PlayerId),
    /// Spectators only.
    Spectators,
}

impl Audience {
    /// Whether an event addressed this way is visible to `player`.
    pub fn includes(&self, player: PlayerId) -> bool {
        match self {
            Audience::Table => true,
            Audience::Player(p) => *p == player,
            Audience::TableExcept(p) => *p != player,
            Audience::Spectators => false,
        }
    }
}

/// A revealed (or mucked) hand at showdown.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Reveal {
    pub position: Position,
    pub player: PlayerId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hole: Option<Hole>,
}

/// Events emitted by the table actor.
///
/// These are the semantic layer between game state and the wire: the
/// protocol module encodes them per recipient, masking private cards.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Event {
    HandStarted {
        hand: HandNumber,
        button: Position,
        stacks: Vec<(Position, Chips)>,
    },
    /// A player's private cards. Addressed to the owner only.
    HoleDealt {
        position: Position,
        player: PlayerId,
        hole: Hole,
    },
    CommunityDealt {
        street: Street,
        cards: Vec<Card>,
        board: Vec<Card>,
    },
    /// A betting action or blind post, in display form.
    ActionTaken {
        position: Position,
        player: PlayerId,
        action: String,
        pot: Chips,
        stack: Chips,
    },
    ActionRequired {
        position: Position,
        player: PlayerId,
        timeout: Duration,
    },
    PhaseChanged {
        phase: Phase,
    },
    Showdown {
        reveals: Vec<Reveal>,
        pots: Vec<PotResult>,
    },
    /// Integrity failure voided the hand; commitments were refunded.
    HandVoided {
        reason: String,
    },
    PlayerJoined {
        seat: SeatView,
    },
    PlayerLeft {
        position: Position,
        player: PlayerId,
    },
    PlayerDisconnected {
        player: PlayerId,
        grace: Duration,
    },
    PlayerReconnected {
        player: PlayerId,
    },
    Chat {
        player: PlayerId,
        name: String,
        text: String,
    },
    /// Full snapshot, unmasked; the gateway masks per recipient.
    State {
        view: GameView,
    },
    /// Typed rejection, addressed to the offender only.
    Error {
        code: String,
        message: String,
    },
}

impl Event {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Event::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
    /// Events that carry state and belong in the replay log.
    pub fn replayable(&self) -> bool {
        !matches!(self, Event::Error { .. } | Event::State { .. })
    }
}

/// One addressed, versioned emission from the actor.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Outbound {
    pub audience: Audience,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<Version>,
    pub event: Event,
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Event::HandStarted { hand, button, .. } => {
                write!(f, "hand #{} (button {})", hand, button)
            }
            Event::HoleDealt { position, hole, .. } => write!(f, "P{} dealt {}", position, hole),
            Event::CommunityDealt { street, board, .. } => {
                write!(f, "{}: {:?}", street, board)
            }
            Event::ActionTaken {
                position, action, ..
            } => write!(f, "P{}: {}", position, action),
            Event::ActionRequired { position, .. } => write!(f, "action on P{}", position),
            Event::PhaseChanged { phase } => write!(f, "phase: {}", phase),
            Event::Showdown { pots, .. } => write!(f, "showdown over {} pots", pots.len()),
            Event::HandVoided { reason } => write!(f, "hand voided: {}", reason),
            Event::PlayerJoined { seat } => write!(f, "P{} joined", seat.position),
            Event::PlayerLeft { position, .. } => write!(f, "P{} left", position),
            Event::PlayerDisconnected { player, .. } => write!(f, "{} disconnected", player),
            Event::PlayerReconnected { player } => write!(f, "{} reconnected", player),
            Event::Chat { name, .. } => write!(f, "chat from {}", name),
            Event::State { view } => write!(f, "snapshot at hand #{}", view.hand_number),
            Event::Error { code, .. } => write!(f, "error: {}", code),
        }
    }
}
