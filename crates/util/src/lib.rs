//! Core type aliases, traits, and constants for riverboat.
//!
//! This crate provides the foundational types and tuning parameters
//! used throughout the riverboat workspace.

// ============================================================================
// TYPE ALIASES
// ============================================================================
/// Chip amounts: stacks, bets, pots, buy-ins.
pub type Chips = i64;
/// Seat index around the table.
pub type Position = usize;
/// Monotonic counter identifying an observable table state.
pub type Version = u64;
/// Hand counter within a table's lifetime.
pub type HandNumber = u64;

// ============================================================================
// DOMAIN TAGS
// Inert unit types that parameterize ID<T> so identifiers of different
// entities cannot be confused at compile time. Tags derive the common
// traits so ID<T> can derive everything it needs.
// ============================================================================
/// Tag for player identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Player;
/// Tag for tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Table;
/// Tag for gateway sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Session;
/// Tag for completed hands in the history sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hand;
/// Tag for wallet escrows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Escrow;

pub type PlayerId = ID<Player>;
pub type TableId = ID<Table>;
pub type SessionId = ID<Session>;
pub type HandId = ID<Hand>;
pub type EscrowId = ID<Escrow>;

// ============================================================================
// TRAITS
// ============================================================================
/// Unique identifier trait for domain entities.
pub trait Unique<T = Self> {
    fn id(&self) -> ID<T>;
}

// ============================================================================
// IDENTITY TYPES
// ============================================================================
use std::marker::PhantomData;

/// A uuid that remembers which entity it names.
///
/// On the wire and in checkpoints an `ID<T>` is just its uuid (serde
/// `transparent`); in the type system the phantom tag keeps a
/// `PlayerId` from ever landing where a `TableId` belongs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(transparent, bound = "")]
pub struct ID<T> {
    uuid: uuid::Uuid,
    #[serde(skip)]
    tag: PhantomData<T>,
}

impl<T> ID<T> {
    /// Mints a fresh, time-ordered (v7) identifier.
    pub fn fresh() -> Self {
        Self::from(uuid::Uuid::now_v7())
    }
    pub fn uuid(&self) -> uuid::Uuid {
        self.uuid
    }
}

impl<T> From<uuid::Uuid> for ID<T> {
    fn from(uuid: uuid::Uuid) -> Self {
        Self {
            uuid,
            tag: PhantomData,
        }
    }
}

impl<T> std::fmt::Display for ID<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.uuid, f)
    }
}

// ============================================================================
// TABLE LIMITS
// ============================================================================
/// Fewest seats a table config may declare.
pub const MIN_SEATS: usize = 2;
/// Most seats a table config may declare.
pub const MAX_SEATS: usize = 10;
/// Big blind must be this multiple of the small blind.
pub const BLIND_RATIO: Chips = 2;
/// Longest chat message relayed to a table, in bytes.
pub const MAX_CHAT_LEN: usize = 256;

// ============================================================================
// TIMING
// ============================================================================
/// Default time a player has to act before being folded out.
pub const ACTION_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);
/// Default window to reconnect before a disconnected player is folded.
pub const DISCONNECT_GRACE: std::time::Duration = std::time::Duration::from_secs(15);
/// Pause between showdown and the next hand.
pub const SETTLING_DELAY: std::time::Duration = std::time::Duration::from_secs(3);
/// Empty tables are destroyed after this quiescence period.
pub const QUIESCENCE: std::time::Duration = std::time::Duration::from_secs(60);
/// Periodic checkpoint interval, on top of transition-driven checkpoints.
pub const CHECKPOINT_EVERY: std::time::Duration = std::time::Duration::from_secs(5);
/// Gateway heartbeat ping interval.
pub const HEARTBEAT: std::time::Duration = std::time::Duration::from_secs(10);
/// Missed-pong budget before a session is declared dead.
pub const MISSED_PONGS: u32 = 2;

// ============================================================================
// CAPACITY & RATE LIMITS
// ============================================================================
/// Bounded depth of each table actor's inbox.
pub const INBOX_CAPACITY: usize = 256;
/// Broadcasts retained per table for reconnect replay.
pub const REPLAY_WINDOW: usize = 512;
/// Recently seen client message ids retained per player.
pub const IDEMPOTENCY_WINDOW: usize = 64;
/// Channel subscriptions allowed per connection.
pub const MAX_SUBSCRIPTIONS: usize = 10;
/// Chat messages allowed per minute per connection.
pub const CHAT_PER_MINUTE: u32 = 30;
/// Lobby summary cache TTL.
pub const SUMMARY_TTL: std::time::Duration = std::time::Duration::from_secs(2);
/// Retries for a failing checkpoint write before the table pauses.
pub const CHECKPOINT_RETRIES: u32 = 5;

// ============================================================================
// RUNTIME UTILITIES
// ============================================================================
/// Initialize logging: INFO on stderr, DEBUG into a per-run file at
/// `logs/riverboat-<pid>.log`.
#[cfg(feature = "server")]
pub fn init_logs() {
    let config = simplelog::ConfigBuilder::new()
        .set_thread_level(log::LevelFilter::Off)
        .set_target_level(log::LevelFilter::Off)
        .set_location_level(log::LevelFilter::Off)
        .build();
    std::fs::create_dir_all("logs").expect("logs directory");
    let path = format!("logs/riverboat-{}.log", std::process::id());
    let file = std::fs::File::create(&path).expect("log file");
    simplelog::CombinedLogger::init(vec![
        simplelog::TermLogger::new(
            log::LevelFilter::Info,
            config.clone(),
            simplelog::TerminalMode::Stderr,
            simplelog::ColorChoice::Auto,
        ),
        simplelog::WriteLogger::new(log::LevelFilter::Debug, config, file),
    ])
    .expect("logger init");
}
