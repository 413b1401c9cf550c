use rvb_core::*;
use rvb_database::Store;
use rvb_gameroom::*;
use rvb_gameroom::Table;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::sync::RwLock;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::Instant;

struct Entry {
    handle: TableHandle,
    config: TableConfig,
    seated: usize,
    phase: Phase,
}

/// The table registry: creates actors from validated configs, routes
/// by table id, and serves the lobby listing.
///
/// Lookups take the read side of the registry lock; create/destroy take
/// the write side. Actors destroy themselves after quiescent emptiness;
/// the registry watches each actor's completion to drop its entry and
/// persisted keys.
pub struct Floor {
    store: Arc<dyn Store>,
    wallet: Arc<dyn Wallet>,
    tables: RwLock<HashMap<TableId, Entry>>,
    cache: Mutex<Option<(Instant, Vec<TableSummary>)>>,
}

impl Floor {
    pub fn new(store: Arc<dyn Store>, wallet: Arc<dyn Wallet>) -> Self {
        Self {
            store,
            wallet,
            tables: RwLock::new(HashMap::new()),
            cache: Mutex::new(None),
        }
    }

    pub fn wallet(&self) -> Arc<dyn Wallet> {
        self.wallet.clone()
    }

    /// Validates the config, persists it, and spawns the table actor.
    /// Returns the id and the outbound stream for the gateway's fanout.
    pub async fn create(
        self: &Arc<Self>,
        config: TableConfig,
    ) -> anyhow::Result<(TableId, UnboundedReceiver<Outbound>)> {
        config.validate()?;
        let id = TableId::fresh();
        let table = Table::new(id, config.clone());
        self.store
            .save_meta(id, serde_json::to_value(&config)?)
            .await?;
        let (handle, outbound, done) = Actor::spawn(table, self.store.clone(), self.wallet.clone());
        self.insert(id, handle, config).await;
        self.watch(id, done);
        log::info!("[floor] created table {}", id);
        Ok((id, outbound))
    }

    /// Respawns every persisted table from its latest checkpoint.
    pub async fn rehydrate(
        self: &Arc<Self>,
    ) -> anyhow::Result<Vec<(TableId, UnboundedReceiver<Outbound>)>> {
        let mut revived = Vec::new();
        for id in self.store.tables().await? {
            let Some(meta) = self.store.load_meta(id).await? else {
                continue;
            };
            let config: TableConfig = serde_json::from_value(meta)?;
            let table = match self.store.load_checkpoint(id).await? {
                Some((_, state)) => {
                    let checkpoint: Checkpoint = serde_json::from_value(state)?;
                    Table::restore(id, config.clone(), checkpoint)
                }
                None => Table::new(id, config.clone()),
            };
            let (handle, outbound, done) =
                Actor::spawn_restored(table, self.store.clone(), self.wallet.clone());
            self.insert(id, handle, config).await;
            self.watch(id, done);
            log::info!("[floor] rehydrated table {}", id);
            revived.push((id, outbound));
        }
        Ok(revived)
    }

    async fn insert(&self, id: TableId, handle: TableHandle, config: TableConfig) {
        let entry = Entry {
            handle,
            config,
            seated: 0,
            phase: Phase::Waiting,
        };
        self.tables.write().await.insert(id, entry);
        self.invalidate().await;
    }

    /// Drops the registry entry and persisted keys once the actor ends.
    fn watch(self: &Arc<Self>, id: TableId, done: tokio::sync::oneshot::Receiver<TableId>) {
        let floor = self.clone();
        tokio::spawn(async move {
            let _ = done.await;
            floor.tables.write().await.remove(&id);
            floor.invalidate().await;
            if let Err(e) = floor.store.remove(id).await {
                log::warn!("[floor] cleanup of {} failed: {}", id, e);
            }
            log::info!("[floor] table {} closed", id);
        });
    }

    /// Address of a running table.
    pub async fn handle(&self, id: TableId) -> Option<TableHandle> {
        self.tables.read().await.get(&id).map(|e| e.handle.clone())
    }

    pub async fn contains(&self, id: TableId) -> bool {
        self.tables.read().await.contains_key(&id)
    }

    /// Tracks occupancy and phase from the event stream, invalidating
    /// the lobby cache on changes that summaries surface.
    pub async fn observe(&self, id: TableId, event: &Event) {
        let mut tables = self.tables.write().await;
        let Some(entry) = tables.get_mut(&id) else {
            return;
        };
        match event {
            Event::PlayerJoined { .. } => entry.seated += 1,
            Event::PlayerLeft { .. } => entry.seated = entry.seated.saturating_sub(1),
            Event::PhaseChanged { phase } => entry.phase = *phase,
            _ => return,
        }
        drop(tables);
        self.invalidate().await;
    }

    async fn invalidate(&self) {
        *self.cache.lock().await = None;
    }

    /// Lobby listing, cached for a short TTL.
    pub async fn list(&self, filter: Option<&str>) -> Vec<TableSummary> {
        {
            let cache = self.cache.lock().await;
            if let Some((at, summaries)) = cache.as_ref() {
                if at.elapsed() < SUMMARY_TTL {
                    return filtered(summaries.clone(), filter);
                }
            }
        }
        let summaries: Vec<TableSummary> = self
            .tables
            .read()
            .await
            .iter()
            .map(|(&id, entry)| TableSummary {
                id,
                name: entry.config.name.clone(),
                small_blind: entry.config.small_blind,
                big_blind: entry.config.big_blind,
                seated: entry.seated,
                max_seats: entry.config.max_seats,
                phase: entry.phase,
            })
            .collect();
        *self.cache.lock().await = Some((Instant::now(), summaries.clone()));
        filtered(summaries, filter)
    }
}

fn filtered(mut summaries: Vec<TableSummary>, filter: Option<&str>) -> Vec<TableSummary> {
    if let Some(filter) = filter {
        let needle = filter.to_lowercase();
        summaries.retain(|s| s.name.to_lowercase().contains(&needle));
    }
    summaries.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    summaries
}

#[cfg(test)]
mod tests {
    use super::*;
    use rvb_database::Memory;

    fn floor() -> Arc<Floor> {
        Arc::new(Floor::new(
            Arc::new(Memory::default()),
            Arc::new(Bankroll::new(100_000)),
        ))
    }

    #[tokio::test]
    async fn create_validates_config() {
        let floor = floor();
        let mut config = TableConfig::standard("bad", 10, 20);
        config.big_blind = 30;
        assert!(floor.create(config).await.is_err());
        assert!(
            floor
                .create(TableConfig::standard("good", 10, 20))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn lookup_and_listing() {
        let floor = floor();
        let (id, _outbound) = floor
            .create(TableConfig::standard("high stakes", 50, 100))
            .await
            .unwrap();
        floor
            .create(TableConfig::standard("low stakes", 10, 20))
            .await
            .unwrap();
        assert!(floor.handle(id).await.is_some());
        assert!(!floor.contains(TableId::fresh()).await);
        assert_eq!(floor.list(None).await.len(), 2);
        let high = floor.list(Some("high")).await;
        assert_eq!(high.len(), 1);
        assert_eq!(high[0].big_blind, 100);
    }

    #[tokio::test]
    async fn observe_updates_summaries() {
        let floor = floor();
        let (id, _outbound) = floor
            .create(TableConfig::standard("main", 10, 20))
            .await
            .unwrap();
        let seat = rvb_gameplay::Seat::new(0, PlayerId::fresh(), "a".into(), 1000);
        floor
            .observe(
                id,
                &Event::PlayerJoined {
                    seat: SeatView::of(&seat, true),
                },
            )
            .await;
        floor
            .observe(id, &Event::PhaseChanged { phase: Phase::PreFlop })
            .await;
        let listing = floor.list(None).await;
        assert_eq!(listing[0].seated, 1);
        assert_eq!(listing[0].phase, Phase::PreFlop);
    }

    #[tokio::test]
    async fn rehydrate_restores_persisted_tables() {
        let store: Arc<dyn Store> = Arc::new(Memory::default());
        let wallet = Arc::new(Bankroll::new(100_000));
        let floor = Arc::new(Floor::new(store.clone(), wallet.clone()));
        let (id, _outbound) = floor
            .create(TableConfig::standard("persisted", 10, 20))
            .await
            .unwrap();
        // a fresh registry over the same store brings the table back
        let reborn = Arc::new(Floor::new(store, wallet));
        let revived = reborn.rehydrate().await.unwrap();
        assert_eq!(revived.len(), 1);
        assert_eq!(revived[0].0, id);
        assert!(reborn.handle(id).await.is_some());
    }
}
