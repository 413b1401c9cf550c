//! DDL for the persistence keyspace.
//!
//! One row per table per concern: the latest checkpoint, the recently
//! seen client message ids, and the immutable table config. Hand history
//! is append-only and idempotent by hand id.

/// Table for the latest checkpoint per game table.
#[rustfmt::skip]
pub const CHECKPOINTS: &str = "checkpoints";
/// Table for recently seen client message ids per game table.
#[rustfmt::skip]
pub const DEDUP:       &str = "dedup";
/// Table for immutable table configuration.
#[rustfmt::skip]
pub const META:        &str = "meta";
/// Table for completed hand records.
#[rustfmt::skip]
pub const HANDS:       &str = "hands";

pub const CREATES: &str = const_format::concatcp!(
    "CREATE TABLE IF NOT EXISTS ",
    CHECKPOINTS,
    " (
        table_id    UUID PRIMARY KEY,
        version     BIGINT NOT NULL,
        state       JSONB NOT NULL,
        updated_at  TIMESTAMPTZ NOT NULL DEFAULT now()
    );
    CREATE TABLE IF NOT EXISTS ",
    DEDUP,
    " (
        table_id    UUID PRIMARY KEY,
        seen        JSONB NOT NULL,
        updated_at  TIMESTAMPTZ NOT NULL DEFAULT now()
    );
    CREATE TABLE IF NOT EXISTS ",
    META,
    " (
        table_id    UUID PRIMARY KEY,
        config      JSONB NOT NULL,
        created_at  TIMESTAMPTZ NOT NULL DEFAULT now()
    );
    CREATE TABLE IF NOT EXISTS ",
    HANDS,
    " (
        id          UUID PRIMARY KEY,
        table_id    UUID NOT NULL,
        record      JSONB NOT NULL,
        played_at   TIMESTAMPTZ NOT NULL DEFAULT now()
    );"
);

pub const INDICES: &str = const_format::concatcp!(
    "CREATE INDEX IF NOT EXISTS idx_hands_table ON ",
    HANDS,
    " (table_id);"
);
