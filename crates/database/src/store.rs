use rvb_core::HandId;
use rvb_core::TableId;
use rvb_core::Version;

/// Persistence failures, as the actor sees them.
#[derive(Debug, Clone)]
pub enum StoreError {
    /// The backend rejected or lost the write; retryable.
    Unavailable(String),
    /// The stored payload does not decode; fatal for recovery.
    Corrupt(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(s) => write!(f, "store unavailable: {}", s),
            Self::Corrupt(s) => write!(f, "stored state corrupt: {}", s),
        }
    }
}

impl std::error::Error for StoreError {}

/// Per-table persistence with single-writer semantics.
///
/// Payloads are opaque JSON: the actor serializes its own checkpoint
/// and dedup shapes, keeping this crate free of game-state types. Each
/// game table writes only its own keys; reads may be concurrent.
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    /// Upserts the latest checkpoint for a table.
    async fn save_checkpoint(
        &self,
        table: TableId,
        version: Version,
        state: serde_json::Value,
    ) -> Result<(), StoreError>;
    /// Loads the latest checkpoint, if one exists.
    async fn load_checkpoint(
        &self,
        table: TableId,
    ) -> Result<Option<(Version, serde_json::Value)>, StoreError>;
    /// Upserts the recently seen client message ids.
    async fn save_dedup(&self, table: TableId, seen: serde_json::Value) -> Result<(), StoreError>;
    async fn load_dedup(&self, table: TableId) -> Result<Option<serde_json::Value>, StoreError>;
    /// Writes the immutable table config, once at creation.
    async fn save_meta(&self, table: TableId, config: serde_json::Value) -> Result<(), StoreError>;
    async fn load_meta(&self, table: TableId) -> Result<Option<serde_json::Value>, StoreError>;
    /// Tables with persisted state, for rehydration at startup.
    async fn tables(&self) -> Result<Vec<TableId>, StoreError>;
    /// Appends a completed hand. Idempotent by hand id.
    async fn append_hand(
        &self,
        hand: HandId,
        table: TableId,
        record: serde_json::Value,
    ) -> Result<(), StoreError>;
    /// Drops all keys of a closed table. Hand history is kept.
    async fn remove(&self, table: TableId) -> Result<(), StoreError>;
}

/// In-memory store for tests and single-node deployments.
#[derive(Default)]
pub struct Memory {
    inner: tokio::sync::Mutex<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    checkpoints: std::collections::HashMap<TableId, (Version, serde_json::Value)>,
    dedup: std::collections::HashMap<TableId, serde_json::Value>,
    meta: std::collections::HashMap<TableId, serde_json::Value>,
    hands: std::collections::HashMap<HandId, (TableId, serde_json::Value)>,
}

#[async_trait::async_trait]
impl Store for Memory {
    async fn save_checkpoint(
        &self,
        table: TableId,
        version: Version,
        state: serde_json::Value,
    ) -> Result<(), StoreError> {
        self.inner
            .lock()
            .await
            .checkpoints
            .insert(table, (version, state));
        Ok(())
    }
    async fn load_checkpoint(
        &self,
        table: TableId,
    ) -> Result<Option<(Version, serde_json::Value)>, StoreError> {
        Ok(self.inner.lock().await.checkpoints.get(&table).cloned())
    }
    async fn save_dedup(&self, table: TableId, seen: serde_json::Value) -> Result<(), StoreError> {
        self.inner.lock().await.dedup.insert(table, seen);
        Ok(())
    }
    async fn load_dedup(&self, table: TableId) -> Result<Option<serde_json::Value>, StoreError> {
        Ok(self.inner.lock().await.dedup.get(&table).cloned())
    }
    async fn save_meta(&self, table: TableId, config: serde_json::Value) -> Result<(), StoreError> {
        self.inner.lock().await.meta.insert(table, config);
        Ok(())
    }
    async fn load_meta(&self, table: TableId) -> Result<Option<serde_json::Value>, StoreError> {
        Ok(self.inner.lock().await.meta.get(&table).cloned())
    }
    async fn tables(&self) -> Result<Vec<TableId>, StoreError> {
        Ok(self.inner.lock().await.meta.keys().copied().collect())
    }
    async fn append_hand(
        &self,
        hand: HandId,
        table: TableId,
        record: serde_json::Value,
    ) -> Result<(), StoreError> {
        self.inner
            .lock()
            .await
            .hands
            .entry(hand)
            .or_insert((table, record));
        Ok(())
    }
    async fn remove(&self, table: TableId) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.checkpoints.remove(&table);
        inner.dedup.remove(&table);
        inner.meta.remove(&table);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rvb_core::ID;

    #[tokio::test]
    async fn checkpoint_roundtrip() {
        let store = Memory::default();
        let table: TableId = ID::fresh();
        let state = serde_json::json!({"phase": "waiting"});
        store.save_checkpoint(table, 3, state.clone()).await.unwrap();
        assert_eq!(
            store.load_checkpoint(table).await.unwrap(),
            Some((3, state))
        );
        assert_eq!(store.load_checkpoint(ID::fresh()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn hands_are_idempotent_by_id() {
        let store = Memory::default();
        let table: TableId = ID::fresh();
        let hand: HandId = ID::fresh();
        let first = serde_json::json!({"pot": 30});
        store.append_hand(hand, table, first.clone()).await.unwrap();
        store
            .append_hand(hand, table, serde_json::json!({"pot": 999}))
            .await
            .unwrap();
        let inner = store.inner.lock().await;
        assert_eq!(inner.hands.get(&hand).unwrap().1, first);
    }

    #[tokio::test]
    async fn remove_keeps_history() {
        let store = Memory::default();
        let table: TableId = ID::fresh();
        let hand: HandId = ID::fresh();
        store
            .save_meta(table, serde_json::json!({"big_blind": 20}))
            .await
            .unwrap();
        store
            .append_hand(hand, table, serde_json::json!({}))
            .await
            .unwrap();
        store.remove(table).await.unwrap();
        assert_eq!(store.tables().await.unwrap(), vec![]);
        assert!(store.inner.lock().await.hands.contains_key(&hand));
    }
}
