use rvb_core::*;
use rvb_gameroom::Audience;
use rvb_gameroom::ChannelKind;
use rvb_gameroom::Viewer;
use std::collections::HashMap;
use std::collections::HashSet;
use tokio::sync::RwLock;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::Instant;

/// A logical channel a connection is subscribed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Lobby,
    Game(TableId),
    Chat(TableId),
    Spectator(TableId),
    Admin,
}

impl Channel {
    pub fn of(kind: ChannelKind, table: Option<TableId>) -> Option<Self> {
        match (kind, table) {
            (ChannelKind::Lobby, _) => Some(Channel::Lobby),
            (ChannelKind::Admin, _) => Some(Channel::Admin),
            (ChannelKind::Game, Some(t)) => Some(Channel::Game(t)),
            (ChannelKind::Chat, Some(t)) => Some(Channel::Chat(t)),
            (ChannelKind::Spectator, Some(t)) => Some(Channel::Spectator(t)),
            _ => None,
        }
    }
}

/// Why a subscription was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeError {
    TooMany,
    Unknown,
}

/// One authenticated connection's registry entry.
///
/// The entry's own mutable state is only ever touched by its connection
/// task; the shared map exists for fanout resolution.
pub struct Entry {
    pub player: PlayerId,
    pub name: String,
    pub admin: bool,
    pub tx: UnboundedSender<String>,
    pub channels: HashSet<Channel>,
}

/// Shared session registry for broadcast fan-out.
#[derive(Default)]
pub struct Sessions {
    inner: RwLock<HashMap<SessionId, Entry>>,
}

impl Sessions {
    pub async fn insert(&self, id: SessionId, entry: Entry) {
        self.inner.write().await.insert(id, entry);
    }
    pub async fn remove(&self, id: SessionId) -> Option<Entry> {
        self.inner.write().await.remove(&id)
    }
    pub async fn subscribe(&self, id: SessionId, channel: Channel) -> Result<(), SubscribeError> {
        let mut inner = self.inner.write().await;
        let entry = inner.get_mut(&id).ok_or(SubscribeError::Unknown)?;
        if entry.channels.len() >= MAX_SUBSCRIPTIONS && !entry.channels.contains(&channel) {
            return Err(SubscribeError::TooMany);
        }
        entry.channels.insert(channel);
        Ok(())
    }
    pub async fn unsubscribe(&self, id: SessionId, channel: Channel) {
        if let Some(entry) = self.inner.write().await.get_mut(&id) {
            entry.channels.remove(&channel);
        }
    }
    pub async fn name_of(&self, id: SessionId) -> Option<String> {
        self.inner.read().await.get(&id).map(|e| e.name.clone())
    }

    /// Resolves an audience at a table into send handles and viewers.
    ///
    /// Players subscribed to the game channel see player-masked frames;
    /// spectator subscriptions see the spectator mask. One socket never
    /// receives the same event twice even if it holds both.
    pub async fn recipients(
        &self,
        table: TableId,
        audience: Audience,
    ) -> Vec<(UnboundedSender<String>, Viewer)> {
        let inner = self.inner.read().await;
        let mut out = Vec::new();
        for entry in inner.values() {
            let plays = entry.channels.contains(&Channel::Game(table))
                || entry.channels.contains(&Channel::Chat(table));
            let watches = entry.channels.contains(&Channel::Spectator(table));
            let (include, viewer) = match audience {
                Audience::Table => {
                    if plays {
                        (true, Viewer::Player(entry.player))
                    } else {
                        (watches, Viewer::Spectator)
                    }
                }
                Audience::Player(p) => (plays && entry.player == p, Viewer::Player(entry.player)),
                Audience::TableExcept(p) => {
                    if plays && entry.player != p {
                        (true, Viewer::Player(entry.player))
                    } else {
                        (watches && entry.player != p, Viewer::Spectator)
                    }
                }
                Audience::Spectators => (watches, Viewer::Spectator),
            };
            if include {
                out.push((entry.tx.clone(), viewer));
            }
        }
        out
    }
}

/// Token bucket for per-connection chat rate limiting.
///
/// Refills continuously; each message takes one token. Sized from the
/// per-minute budget so a full bucket allows a short burst.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: f64,
    tokens: f64,
    per_second: f64,
    last: Instant,
}

impl TokenBucket {
    pub fn per_minute(budget: u32) -> Self {
        Self {
            capacity: budget as f64,
            tokens: budget as f64,
            per_second: budget as f64 / 60.0,
            last: Instant::now(),
        }
    }
    pub fn try_take(&mut self, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last).as_secs_f64();
        self.last = now;
        self.tokens = (self.tokens + elapsed * self.per_second).min(self.capacity);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;

    async fn session(sessions: &Sessions, channels: &[Channel]) -> (SessionId, PlayerId) {
        let id = SessionId::fresh();
        let player = PlayerId::fresh();
        let (tx, _rx) = unbounded_channel();
        sessions
            .insert(
                id,
                Entry {
                    player,
                    name: "p".into(),
                    admin: false,
                    tx,
                    channels: channels.iter().copied().collect(),
                },
            )
            .await;
        (id, player)
    }

    #[tokio::test]
    async fn subscription_cap_is_enforced() {
        let sessions = Sessions::default();
        let (id, _) = session(&sessions, &[]).await;
        for _ in 0..MAX_SUBSCRIPTIONS {
            let table = TableId::fresh();
            assert_eq!(sessions.subscribe(id, Channel::Game(table)).await, Ok(()));
        }
        assert_eq!(
            sessions.subscribe(id, Channel::Game(TableId::fresh())).await,
            Err(SubscribeError::TooMany)
        );
    }

    #[tokio::test]
    async fn audience_resolution_separates_players_and_spectators() {
        let sessions = Sessions::default();
        let table = TableId::fresh();
        let (_, player) = session(&sessions, &[Channel::Game(table)]).await;
        session(&sessions, &[Channel::Spectator(table)]).await;
        let all = sessions.recipients(table, Audience::Table).await;
        assert_eq!(all.len(), 2);
        assert!(all.iter().any(|(_, v)| *v == Viewer::Player(player)));
        assert!(all.iter().any(|(_, v)| *v == Viewer::Spectator));
        let only = sessions.recipients(table, Audience::Player(player)).await;
        assert_eq!(only.len(), 1);
        let except = sessions
            .recipients(table, Audience::TableExcept(player))
            .await;
        assert_eq!(except.len(), 1);
        assert_eq!(except[0].1, Viewer::Spectator);
        let specs = sessions.recipients(table, Audience::Spectators).await;
        assert_eq!(specs.len(), 1);
    }

    #[tokio::test]
    async fn chat_bucket_limits_bursts() {
        let mut bucket = TokenBucket::per_minute(3);
        let now = Instant::now();
        assert!(bucket.try_take(now));
        assert!(bucket.try_take(now));
        assert!(bucket.try_take(now));
        assert!(!bucket.try_take(now));
        // tokens come back with time
        assert!(bucket.try_take(now + std::time::Duration::from_secs(30)));
    }
}
