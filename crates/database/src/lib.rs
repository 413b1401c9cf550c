//! Checkpoint and hand-history persistence.
//!
//! Each game table owns a small keyspace: its latest checkpoint, its
//! recently seen client message ids, and its immutable config. Writes
//! mirror the actor's single-writer discipline; reads may be concurrent.
//!
//! ## Connectivity
//!
//! - [`db()`] — Establishes a database connection from `DB_URL`
//!
//! ## Stores
//!
//! - [`Store`] — The persistence seam the table actor writes through
//! - [`Postgres`] — JSONB rows keyed by table id
//! - [`Memory`] — In-process store for tests and single-node runs

mod postgres;
mod schema;
mod store;

pub use postgres::*;
pub use schema::*;
pub use store::*;

use std::sync::Arc;
use tokio_postgres::Client;

/// Establishes a database connection.
///
/// Connects to PostgreSQL using the `DB_URL` environment variable and
/// returns an `Arc<Client>` suitable for sharing across tasks.
///
/// # Panics
///
/// Panics if `DB_URL` is not set or the connection fails.
pub async fn db() -> Arc<Client> {
    log::info!("connecting to database");
    let tls = tokio_postgres::tls::NoTls;
    let ref url = std::env::var("DB_URL").expect("DB_URL must be set");
    let (client, connection) = tokio_postgres::connect(url, tls)
        .await
        .expect("database connection failed");
    tokio::spawn(connection);
    Arc::new(client)
}
