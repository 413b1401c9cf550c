use super::AppState;
use super::session::Channel;
use super::session::Entry;
use super::session::SubscribeError;
use super::session::TokenBucket;
use futures::StreamExt;
use rvb_core::*;
use rvb_gameroom::*;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::mpsc::unbounded_channel;
use tokio::time::Instant;

/// How long a fresh connection has to authenticate.
const AUTH_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

/// WebSocket endpoint: hand the connection to its own task.
pub async fn endpoint(
    req: actix_web::HttpRequest,
    stream: actix_web::web::Payload,
    state: actix_web::web::Data<AppState>,
) -> Result<actix_web::HttpResponse, actix_web::Error> {
    let (response, session, frames) = actix_ws::handle(&req, stream)?;
    actix_web::rt::spawn(serve(session, frames, state.into_inner()));
    Ok(response)
}

/// One connection's lifetime: authenticate first, then pump frames both
/// ways with heartbeats until either side gives up.
async fn serve(
    mut socket: actix_ws::Session,
    mut frames: actix_ws::MessageStream,
    state: Arc<AppState>,
) {
    let Some(claims) = authenticate(&mut socket, &mut frames, &state).await else {
        let _ = socket.close(None).await;
        return;
    };
    let session = SessionId::fresh();
    let player = claims.player();
    let (tx, mut rx) = unbounded_channel::<String>();
    state
        .sessions
        .insert(
            session,
            Entry {
                player,
                name: claims.name().to_string(),
                admin: claims.is_admin(),
                tx: tx.clone(),
                channels: HashSet::new(),
            },
        )
        .await;
    send(
        &tx,
        ServerMessage::Connected {
            player_id: player,
            name: claims.name().to_string(),
        },
    );
    log::info!("[gateway] {} connected as session {}", player, session);
    let mut conn = Conn {
        state: state.clone(),
        session,
        player,
        admin: claims.is_admin(),
        tx,
        chat: TokenBucket::per_minute(CHAT_PER_MINUTE),
    };
    let mut heartbeat = tokio::time::interval(HEARTBEAT);
    heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut missed: u32 = 0;
    loop {
        tokio::select! {
            biased;
            outbound = rx.recv() => match outbound {
                Some(json) => {
                    if socket.text(json).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
            frame = frames.next() => match frame {
                Some(Ok(actix_ws::Message::Text(text))) => conn.handle(&text).await,
                Some(Ok(actix_ws::Message::Ping(payload))) => {
                    let _ = socket.pong(&payload).await;
                }
                Some(Ok(actix_ws::Message::Pong(_))) => missed = 0,
                Some(Ok(actix_ws::Message::Close(_))) | Some(Err(_)) | None => break,
                _ => {}
            },
            _ = heartbeat.tick() => {
                if missed >= MISSED_PONGS {
                    log::debug!("[gateway] session {} missed pongs, dropping", session);
                    break;
                }
                missed += 1;
                if socket.ping(b"").await.is_err() {
                    break;
                }
            }
        }
    }
    conn.teardown().await;
    let _ = socket.close(None).await;
    log::info!("[gateway] session {} closed", session);
}

/// The first frame must be a valid `authenticate`; anything else closes
/// the connection with a typed reason.
async fn authenticate(
    socket: &mut actix_ws::Session,
    frames: &mut actix_ws::MessageStream,
    state: &AppState,
) -> Option<rvb_auth::Claims> {
    let frame = tokio::time::timeout(AUTH_TIMEOUT, frames.next()).await.ok()??;
    let text = match frame {
        Ok(actix_ws::Message::Text(text)) => text,
        _ => return None,
    };
    let token = match Protocol::parse(&text) {
        Ok(ClientFrame {
            message: ClientMessage::Authenticate { token },
            ..
        }) => token,
        _ => {
            let frame = ServerFrame::new(
                ServerMessage::Error {
                    code: "unauthorized".into(),
                    message: "authenticate first".into(),
                },
                None,
            );
            let _ = socket.text(frame.to_json()).await;
            return None;
        }
    };
    match state.verifier.verify(&token) {
        Ok(claims) => Some(claims),
        Err(_) => {
            let frame = ServerFrame::new(
                ServerMessage::Error {
                    code: "unauthorized".into(),
                    message: "invalid token".into(),
                },
                None,
            );
            let _ = socket.text(frame.to_json()).await;
            None
        }
    }
}

fn send(tx: &UnboundedSender<String>, message: ServerMessage) {
    let _ = tx.send(ServerFrame::new(message, None).to_json());
}

/// Per-connection routing state.
struct Conn {
    state: Arc<AppState>,
    session: SessionId,
    player: PlayerId,
    admin: bool,
    tx: UnboundedSender<String>,
    chat: TokenBucket,
}

impl Conn {
    fn error(&self, code: &str, message: &str) {
        send(
            &self.tx,
            ServerMessage::Error {
                code: code.to_string(),
                message: message.to_string(),
            },
        );
    }

    /// Routes one inbound message onto the right actor, tagged with the
    /// authenticated player id. Backpressure surfaces as a retryable
    /// error; nothing here blocks on a table.
    async fn handle(&mut self, text: &str) {
        let frame = match Protocol::parse(text) {
            Ok(frame) => frame,
            Err(e) => return self.error("invalid_action", &e.to_string()),
        };
        match frame.message {
            ClientMessage::Authenticate { .. } => {
                self.error("unauthorized", "already authenticated")
            }
            ClientMessage::Ping => send(&self.tx, ServerMessage::Pong),
            ClientMessage::Subscribe { channel, table_id } => {
                self.subscribe(channel, table_id).await
            }
            ClientMessage::Unsubscribe { channel, table_id } => {
                let Some(channel) = Channel::of(channel, table_id) else {
                    return self.error("invalid_action", "table_id required");
                };
                self.state.sessions.unsubscribe(self.session, channel).await;
                if let Channel::Game(table) = channel {
                    self.forward(table, Message::Disconnect {
                        player: self.player,
                        session: self.session,
                    })
                    .await;
                }
            }
            ClientMessage::JoinTable {
                table_id,
                seat_index,
                buy_in,
            } => self.join(table_id, seat_index, buy_in).await,
            ClientMessage::LeaveTable { table_id } => {
                self.forward(table_id, Message::Leave {
                    player: self.player,
                })
                .await
            }
            ClientMessage::SitIn { table_id } => {
                self.forward(table_id, Message::Sit {
                    player: self.player,
                    out: false,
                })
                .await
            }
            ClientMessage::SitOut { table_id } => {
                self.forward(table_id, Message::Sit {
                    player: self.player,
                    out: true,
                })
                .await
            }
            ClientMessage::PlayerAction {
                table_id,
                action,
                amount,
                client_message_id,
            } => {
                let action = match Protocol::action(&action, amount) {
                    Ok(action) => action,
                    Err(e) => return self.error("invalid_action", &e.to_string()),
                };
                self.forward(table_id, Message::Act {
                    player: self.player,
                    action,
                    client_id: client_message_id,
                })
                .await
            }
            ClientMessage::Chat { table_id, text } => {
                if !self.chat.try_take(Instant::now()) {
                    return self.error("rate_limited", "chat limit exceeded");
                }
                self.forward(table_id, Message::Chat {
                    player: self.player,
                    text,
                })
                .await
            }
            ClientMessage::Reconnect {
                table_id,
                last_seen_version,
            } => {
                self.forward(table_id, Message::Reconnect {
                    player: self.player,
                    session: self.session,
                    last_seen: last_seen_version,
                })
                .await
            }
        }
    }

    async fn subscribe(&mut self, kind: ChannelKind, table_id: Option<TableId>) {
        let Some(channel) = Channel::of(kind, table_id) else {
            return self.error("invalid_action", "table_id required");
        };
        if channel == Channel::Admin && !self.admin {
            return self.error("unauthorized", "admin role required");
        }
        if let Channel::Game(t) | Channel::Chat(t) | Channel::Spectator(t) = channel {
            if !self.state.floor.contains(t).await {
                return self.error("table_not_found", "no such table");
            }
        }
        match self.state.sessions.subscribe(self.session, channel).await {
            Ok(()) => {}
            Err(SubscribeError::TooMany) => {
                return self.error("rate_limited", "subscription cap exceeded");
            }
            Err(SubscribeError::Unknown) => {
                return self.error("unauthorized", "session not registered");
            }
        }
        send(
            &self.tx,
            ServerMessage::SubscriptionConfirmed {
                channel: kind,
                table_id,
            },
        );
        match channel {
            Channel::Lobby => {
                let tables = self.state.floor.list(None).await;
                send(&self.tx, ServerMessage::TableList { tables });
            }
            Channel::Game(table) => {
                self.forward(table, Message::Connect {
                    player: self.player,
                    session: self.session,
                })
                .await;
            }
            _ => {}
        }
    }

    async fn join(&mut self, table: TableId, seat: Position, buy_in: Chips) {
        let Some(handle) = self.state.floor.handle(table).await else {
            return self.error("table_not_found", "no such table");
        };
        let wallet = self.state.floor.wallet();
        let escrow = match wallet.reserve(self.player, buy_in).await {
            Ok(escrow) => escrow,
            Err(e) => return self.error("insufficient_funds", &e.to_string()),
        };
        let join = Message::Join {
            player: self.player,
            name: self
                .state
                .sessions
                .name_of(self.session)
                .await
                .unwrap_or_else(|| self.player.to_string()),
            seat,
            buy_in,
            escrow,
        };
        if handle.send(join).is_err() {
            let _ = wallet.release(escrow).await;
            self.error("backpressure_dropped", "table is busy, retry");
        }
    }

    /// Sends to a table actor, translating lookup and inbox failures.
    async fn forward(&self, table: TableId, msg: Message) {
        match self.state.floor.handle(table).await {
            Some(handle) => {
                if handle.send(msg).is_err() {
                    self.error("backpressure_dropped", "table is busy, retry");
                }
            }
            None => self.error("table_not_found", "no such table"),
        }
    }

    /// Session death: deregister and tell every joined table.
    async fn teardown(&self) {
        let Some(entry) = self.state.sessions.remove(self.session).await else {
            return;
        };
        for channel in entry.channels {
            if let Channel::Game(table) = channel {
                if let Some(handle) = self.state.floor.handle(table).await {
                    let _ = handle.send(Message::Disconnect {
                        player: self.player,
                        session: self.session,
                    });
                }
            }
        }
    }
}
