use super::*;
use rvb_cards::Card;
use rvb_cards::Hole;
use rvb_cards::Street;
use rvb_core::*;
use rvb_gameplay::Action;
use rvb_gameplay::PotResult;

/// Protocol-level failures; the session closes or answers a typed error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    Malformed(String),
    InvalidAction(String),
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(s) => write!(f, "malformed message: {}", s),
            Self::InvalidAction(s) => write!(f, "invalid action: {}", s),
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Logical channels a connection may subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Lobby,
    Game,
    Chat,
    Spectator,
    Admin,
}

/// Messages clients send, tagged by `type` with a `payload` object.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ClientMessage {
    Authenticate {
        token: String,
    },
    Subscribe {
        channel: ChannelKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        table_id: Option<TableId>,
    },
    Unsubscribe {
        channel: ChannelKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        table_id: Option<TableId>,
    },
    Ping,
    JoinTable {
        table_id: TableId,
        seat_index: Position,
        buy_in: Chips,
    },
    LeaveTable {
        table_id: TableId,
    },
    SitIn {
        table_id: TableId,
    },
    SitOut {
        table_id: TableId,
    },
    PlayerAction {
        table_id: TableId,
        action: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        amount: Option<Chips>,
        client_message_id: String,
    },
    Chat {
        table_id: TableId,
        text: String,
    },
    Reconnect {
        table_id: TableId,
        last_seen_version: Version,
    },
}

/// Client envelope: `{ type, payload, timestamp }`.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ClientFrame {
    #[serde(flatten)]
    pub message: ClientMessage,
    #[serde(default)]
    pub timestamp: Option<u64>,
}

/// Seat-level changes carried inside `game_update` frames.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Delta {
    PlayerJoined { seat: SeatView },
    PlayerLeft { position: Position, player_id: PlayerId },
    HandVoided { reason: String },
}

/// Messages the server sends, tagged by `type` with a `payload` object.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerMessage {
    Connected {
        player_id: PlayerId,
        name: String,
    },
    SubscriptionConfirmed {
        channel: ChannelKind,
        #[serde(skip_serializing_if = "Option::is_none")]
        table_id: Option<TableId>,
    },
    Error {
        code: String,
        message: String,
    },
    TableState {
        view: GameView,
    },
    GameUpdate {
        delta: Delta,
    },
    HandStarted {
        hand_number: HandNumber,
        button: Position,
        stacks: Vec<(Position, Chips)>,
    },
    CardsDealt {
        #[serde(skip_serializing_if = "Option::is_none")]
        hole: Option<Hole>,
        #[serde(skip_serializing_if = "Option::is_none")]
        street: Option<Street>,
        #[serde(skip_serializing_if = "Option::is_none")]
        cards: Option<Vec<Card>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        board: Option<Vec<Card>>,
    },
    ActionRequired {
        player_id: PlayerId,
        position: Position,
        timeout_ms: u64,
    },
    ActionTaken {
        player_id: PlayerId,
        position: Position,
        action: String,
        pot: Chips,
        stack: Chips,
    },
    PhaseChanged {
        phase: Phase,
    },
    Showdown {
        hands: Vec<Reveal>,
        pots: Vec<PotResult>,
    },
    ChatMessage {
        player_id: PlayerId,
        name: String,
        text: String,
    },
    PlayerDisconnected {
        player_id: PlayerId,
        grace_ms: u64,
    },
    PlayerReconnected {
        player_id: PlayerId,
    },
    TableList {
        tables: Vec<TableSummary>,
    },
    Pong,
}

/// Server envelope: `{ type, payload, version?, timestamp }`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ServerFrame {
    #[serde(flatten)]
    pub message: ServerMessage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<Version>,
    pub timestamp: u64,
}

impl ServerFrame {
    pub fn new(message: ServerMessage, version: Option<Version>) -> Self {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time moves slow")
            .as_millis() as u64;
        Self {
            message,
            version,
            timestamp,
        }
    }
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("serialize server frame")
    }
}

/// Encode/decode between wire frames and actor events.
///
/// Encoding is per recipient: this is where view masks apply, so a hole
/// card that is not the viewer's never reaches serialization.
pub struct Protocol;

impl Protocol {
    pub fn parse(text: &str) -> Result<ClientFrame, ProtocolError> {
        serde_json::from_str(text).map_err(|e| ProtocolError::Malformed(e.to_string()))
    }

    /// Resolves the wire `{action, amount}` pair into a betting action.
    pub fn action(name: &str, amount: Option<Chips>) -> Result<Action, ProtocolError> {
        match (name, amount) {
            ("fold", _) => Ok(Action::Fold),
            ("check", _) => Ok(Action::Check),
            ("call", _) => Ok(Action::Call),
            ("all_in", _) | ("all-in", _) => Ok(Action::AllIn),
            ("bet", Some(n)) => Ok(Action::Bet(n)),
            ("raise", Some(n)) => Ok(Action::Raise(n)),
            ("bet", None) | ("raise", None) => {
                Err(ProtocolError::InvalidAction("amount required".into()))
            }
            _ => Err(ProtocolError::InvalidAction(name.to_string())),
        }
    }

    /// Converts an event to the viewer's wire message. `None` means the
    /// event is not for this viewer at all (e.g. another player's hole).
    pub fn encode(event: &Event, viewer: Viewer) -> Option<ServerMessage> {
        match event {
            Event::HandStarted {
                hand,
                button,
                stacks,
            } => Some(ServerMessage::HandStarted {
                hand_number: *hand,
                button: *button,
                stacks: stacks.clone(),
            }),
            Event::HoleDealt { player, hole, .. } => match viewer {
                Viewer::Player(p) if p == *player => Some(ServerMessage::CardsDealt {
                    hole: Some(*hole),
                    street: None,
                    cards: None,
                    board: None,
                }),
                _ => None,
            },
            Event::CommunityDealt {
                street,
                cards,
                board,
            } => Some(ServerMessage::CardsDealt {
                hole: None,
                street: Some(*street),
                cards: Some(cards.clone()),
                board: Some(board.clone()),
            }),
            Event::ActionTaken {
                position,
                player,
                action,
                pot,
                stack,
            } => Some(ServerMessage::ActionTaken {
                player_id: *player,
                position: *position,
                action: action.clone(),
                pot: *pot,
                stack: *stack,
            }),
            Event::ActionRequired {
                position,
                player,
                timeout,
            } => Some(ServerMessage::ActionRequired {
                player_id: *player,
                position: *position,
                timeout_ms: timeout.as_millis() as u64,
            }),
            Event::PhaseChanged { phase } => Some(ServerMessage::PhaseChanged { phase: *phase }),
            Event::Showdown { reveals, pots } => Some(ServerMessage::Showdown {
                hands: reveals.clone(),
                pots: pots.clone(),
            }),
            Event::HandVoided { reason } => Some(ServerMessage::GameUpdate {
                delta: Delta::HandVoided {
                    reason: reason.clone(),
                },
            }),
            Event::PlayerJoined { seat } => {
                let mut seat = seat.clone();
                if !matches!(viewer, Viewer::Player(p) if p == seat.player) {
                    seat.hole = None;
                }
                Some(ServerMessage::GameUpdate {
                    delta: Delta::PlayerJoined { seat },
                })
            }
            Event::PlayerLeft { position, player } => Some(ServerMessage::GameUpdate {
                delta: Delta::PlayerLeft {
                    position: *position,
                    player_id: *player,
                },
            }),
            Event::PlayerDisconnected { player, grace } => {
                Some(ServerMessage::PlayerDisconnected {
                    player_id: *player,
                    grace_ms: grace.as_millis() as u64,
                })
            }
            Event::PlayerReconnected { player } => Some(ServerMessage::PlayerReconnected {
                player_id: *player,
            }),
            Event::Chat { player, name, text } => Some(ServerMessage::ChatMessage {
                player_id: *player,
                name: name.clone(),
                text: text.clone(),
            }),
            Event::State { view } => Some(ServerMessage::TableState {
                view: view.masked_for(viewer),
            }),
            Event::Error { code, message } => Some(ServerMessage::Error {
                code: code.clone(),
                message: message.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_player_action_frame() {
        let text = r#"{
            "type": "player_action",
            "payload": {
                "table_id": "018f4d5e-0000-7000-8000-000000000000",
                "action": "raise",
                "amount": 60,
                "client_message_id": "M1"
            },
            "timestamp": 1722500000000
        }"#;
        let frame = Protocol::parse(text).unwrap();
        match frame.message {
            ClientMessage::PlayerAction { action, amount, .. } => {
                assert_eq!(Protocol::action(&action, amount), Ok(Action::Raise(60)));
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn rejects_malformed_frames() {
        assert!(Protocol::parse("not json").is_err());
        assert!(Protocol::parse(r#"{"type": "no_such_type"}"#).is_err());
    }

    #[test]
    fn action_requires_amount_for_sizable_bets() {
        assert!(Protocol::action("bet", None).is_err());
        assert!(Protocol::action("fold", None).is_ok());
        assert_eq!(Protocol::action("call", Some(99)), Ok(Action::Call));
    }

    #[test]
    fn hole_cards_encode_only_for_their_owner() {
        let player = PlayerId::fresh();
        let other = PlayerId::fresh();
        let event = Event::HoleDealt {
            position: 0,
            player,
            hole: Hole::try_from("AsKd").unwrap(),
        };
        assert!(Protocol::encode(&event, Viewer::Player(player)).is_some());
        assert!(Protocol::encode(&event, Viewer::Player(other)).is_none());
        assert!(Protocol::encode(&event, Viewer::Spectator).is_none());
    }

    #[test]
    fn frames_carry_version_and_timestamp() {
        let frame = ServerFrame::new(ServerMessage::Pong, Some(7));
        let json = frame.to_json();
        assert!(json.contains("\"version\":7"));
        assert!(json.contains("\"type\":\"pong\""));
    }
}
