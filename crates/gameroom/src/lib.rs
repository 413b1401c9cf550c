//! The table actor: authoritative state for one poker table.
//!
//! Every mutation of a table's players, pots, and hand lifecycle happens
//! inside its single-writer [`Table`] core, reached only through the
//! actor's inbox. The async [`Actor`] shell owns the bounded inbox, the
//! timers, and persistence; the gateway only ever sees addressed
//! [`Outbound`] events.
//!
//! ## Core
//!
//! - [`Table`] — Synchronous single-writer state machine
//! - [`Actor`] / [`TableHandle`] — Async shell and its address
//! - [`Message`] — The inbox vocabulary
//! - [`Phase`] — Hand lifecycle (waiting through settling)
//!
//! ## Outbound
//!
//! - [`Event`] / [`Audience`] / [`Outbound`] — Addressed emissions
//! - [`Protocol`] / [`ServerMessage`] / [`ClientMessage`] — Wire codec
//! - [`GameView`] / [`Viewer`] — Maskable snapshots
//!
//! ## Reliability
//!
//! - [`Dedup`] — Idempotency by client message id
//! - [`Replay`] — Reconnect catch-up window
//! - [`Checkpoint`] — Durable actor state
//!
//! ## Collaborators
//!
//! - [`Wallet`] / [`Bankroll`] — Escrowed buy-ins
//! - [`HandRecord`] — History sink payloads

mod actor;
mod config;
mod dedup;
mod event;
mod message;
mod phase;
mod protocol;
mod records;
mod replay;
mod table;
mod timer;
mod view;
mod wallet;

pub use actor::*;
pub use config::*;
pub use dedup::*;
pub use event::*;
pub use message::*;
pub use phase::*;
pub use protocol::*;
pub use records::*;
pub use replay::*;
pub use table::*;
pub use timer::*;
pub use view::*;
pub use wallet::*;
