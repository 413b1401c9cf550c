//! Table registry and lobby.
//!
//! [`Floor`] owns the map from table ids to running actors: it validates
//! configs, spawns and rehydrates actors, watches their shutdown, and
//! serves the TTL-cached lobby listing.

mod floor;

pub use floor::*;
