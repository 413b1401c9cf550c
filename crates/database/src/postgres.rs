use super::schema;
use super::store::Store;
use super::store::StoreError;
use rvb_core::HandId;
use rvb_core::TableId;
use rvb_core::Version;
use std::sync::Arc;
use tokio_postgres::Client;

/// PostgreSQL-backed [`Store`].
///
/// One row per table per concern, JSONB payloads, upsert semantics.
/// Writes are per-table single-writer by construction (only the owning
/// actor touches its keys), so plain upserts suffice.
pub struct Postgres {
    client: Arc<Client>,
}

impl Postgres {
    /// Wraps a connected client and ensures the schema exists.
    pub async fn new(client: Arc<Client>) -> Result<Self, StoreError> {
        client
            .batch_execute(schema::CREATES)
            .await
            .map_err(wire)?;
        client
            .batch_execute(schema::INDICES)
            .await
            .map_err(wire)?;
        Ok(Self { client })
    }
}

fn wire(e: tokio_postgres::Error) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

#[async_trait::async_trait]
impl Store for Postgres {
    async fn save_checkpoint(
        &self,
        table: TableId,
        version: Version,
        state: serde_json::Value,
    ) -> Result<(), StoreError> {
        self.client
            .execute(
                const_format::concatcp!(
                    "INSERT INTO ",
                    schema::CHECKPOINTS,
                    " (table_id, version, state) VALUES ($1, $2, $3)
                     ON CONFLICT (table_id)
                     DO UPDATE SET version = $2, state = $3, updated_at = now()"
                ),
                &[&table.uuid(), &(version as i64), &state],
            )
            .await
            .map(|_| ())
            .map_err(wire)
    }
    async fn load_checkpoint(
        &self,
        table: TableId,
    ) -> Result<Option<(Version, serde_json::Value)>, StoreError> {
        self.client
            .query_opt(
                const_format::concatcp!(
                    "SELECT version, state FROM ",
                    schema::CHECKPOINTS,
                    " WHERE table_id = $1"
                ),
                &[&table.uuid()],
            )
            .await
            .map_err(wire)
            .map(|row| {
                row.map(|row| {
                    let version: i64 = row.get(0);
                    (version as Version, row.get(1))
                })
            })
    }
    async fn save_dedup(&self, table: TableId, seen: serde_json::Value) -> Result<(), StoreError> {
        self.client
            .execute(
                const_format::concatcp!(
                    "INSERT INTO ",
                    schema::DEDUP,
                    " (table_id, seen) VALUES ($1, $2)
                     ON CONFLICT (table_id)
                     DO UPDATE SET seen = $2, updated_at = now()"
                ),
                &[&table.uuid(), &seen],
            )
            .await
            .map(|_| ())
            .map_err(wire)
    }
    async fn load_dedup(&self, table: TableId) -> Result<Option<serde_json::Value>, StoreError> {
        self.client
            .query_opt(
                const_format::concatcp!(
                    "SELECT seen FROM ",
                    schema::DEDUP,
                    " WHERE table_id = $1"
                ),
                &[&table.uuid()],
            )
            .await
            .map_err(wire)
            .map(|row| row.map(|row| row.get(0)))
    }
    async fn save_meta(&self, table: TableId, config: serde_json::Value) -> Result<(), StoreError> {
        self.client
            .execute(
                const_format::concatcp!(
                    "INSERT INTO ",
                    schema::META,
                    " (table_id, config) VALUES ($1, $2)
                     ON CONFLICT (table_id) DO NOTHING"
                ),
                &[&table.uuid(), &config],
            )
            .await
            .map(|_| ())
            .map_err(wire)
    }
    async fn load_meta(&self, table: TableId) -> Result<Option<serde_json::Value>, StoreError> {
        self.client
            .query_opt(
                const_format::concatcp!(
                    "SELECT config FROM ",
                    schema::META,
                    " WHERE table_id = $1"
                ),
                &[&table.uuid()],
            )
            .await
            .map_err(wire)
            .map(|row| row.map(|row| row.get(0)))
    }
    async fn tables(&self) -> Result<Vec<TableId>, StoreError> {
        self.client
            .query(
                const_format::concatcp!("SELECT table_id FROM ", schema::META),
                &[],
            )
            .await
            .map_err(wire)
            .map(|rows| {
                rows.into_iter()
                    .map(|row| TableId::from(row.get::<_, uuid::Uuid>(0)))
                    .collect()
            })
    }
    async fn append_hand(
        &self,
        hand: HandId,
        table: TableId,
        record: serde_json::Value,
    ) -> Result<(), StoreError> {
        self.client
            .execute(
                const_format::concatcp!(
                    "INSERT INTO ",
                    schema::HANDS,
                    " (id, table_id, record) VALUES ($1, $2, $3)
                     ON CONFLICT (id) DO NOTHING"
                ),
                &[&hand.uuid(), &table.uuid(), &record],
            )
            .await
            .map(|_| ())
            .map_err(wire)
    }
    async fn remove(&self, table: TableId) -> Result<(), StoreError> {
        for sql in [
            const_format::concatcp!("DELETE FROM ", schema::CHECKPOINTS, " WHERE table_id = $1"),
            const_format::concatcp!("DELETE FROM ", schema::DEDUP, " WHERE table_id = $1"),
            const_format::concatcp!("DELETE FROM ", schema::META, " WHERE table_id = $1"),
        ] {
            self.client
                .execute(sql, &[&table.uuid()])
                .await
                .map_err(wire)?;
        }
        Ok(())
    }
}
