use super::*;
use rvb_core::CHECKPOINT_EVERY;
use rvb_core::CHECKPOINT_RETRIES;
use rvb_core::INBOX_CAPACITY;
use rvb_core::TableId;
use rvb_core::Unique;
use rvb_database::Store;
use rvb_database::StoreError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio::time::Instant;

/// Sending into a full inbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backpressure;

impl std::fmt::Display for Backpressure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "table inbox full")
    }
}

impl std::error::Error for Backpressure {}

/// Shared address of a running table actor.
///
/// `send` never blocks: a full inbox answers [`Backpressure`] and the
/// gateway turns that into a retryable error for the client. A closed
/// inbox (actor gone) reports the same way.
#[derive(Clone)]
pub struct TableHandle {
    id: TableId,
    inbox: mpsc::Sender<Message>,
}

impl Unique<rvb_core::Table> for TableHandle {
    fn id(&self) -> TableId {
        self.id
    }
}

impl TableHandle {
    pub fn send(&self, msg: Message) -> Result<(), Backpressure> {
        self.inbox.try_send(msg).map_err(|_| Backpressure)
    }
}

/// Async shell around the single-writer [`Table`] core.
///
/// Owns the bounded inbox, sleeps until the earliest table deadline or
/// the periodic checkpoint mark, and performs the core's effects after
/// each step: checkpoint writes (with bounded backoff), wallet
/// settlement, and history appends. Outbound events stream to the
/// gateway's fanout through an unbounded channel.
pub struct Actor {
    table: Table,
    inbox: mpsc::Receiver<Message>,
    outbox: mpsc::UnboundedSender<Outbound>,
    store: Arc<dyn Store>,
    wallet: Arc<dyn Wallet>,
    done: Option<oneshot::Sender<TableId>>,
    last_checkpoint: Instant,
}

impl Actor {
    /// Spawns the actor task. Returns its handle, the outbound stream
    /// for the gateway, and a completion signal for the registry.
    pub fn spawn(
        table: Table,
        store: Arc<dyn Store>,
        wallet: Arc<dyn Wallet>,
    ) -> (
        TableHandle,
        mpsc::UnboundedReceiver<Outbound>,
        oneshot::Receiver<TableId>,
    ) {
        let id = table.id();
        let (tx, rx) = mpsc::channel(INBOX_CAPACITY);
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (done_tx, done_rx) = oneshot::channel();
        let actor = Self {
            table,
            inbox: rx,
            outbox: out_tx,
            store,
            wallet,
            done: Some(done_tx),
            last_checkpoint: Instant::now(),
        };
        tokio::spawn(actor.run());
        (TableHandle { id, inbox: tx }, out_rx, done_rx)
    }

    /// Spawns from a checkpoint, replaying the resume step first.
    pub fn spawn_restored(
        table: Table,
        store: Arc<dyn Store>,
        wallet: Arc<dyn Wallet>,
    ) -> (
        TableHandle,
        mpsc::UnboundedReceiver<Outbound>,
        oneshot::Receiver<TableId>,
    ) {
        let id = table.id();
        let (tx, rx) = mpsc::channel(INBOX_CAPACITY);
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (done_tx, done_rx) = oneshot::channel();
        let mut actor = Self {
            table,
            inbox: rx,
            outbox: out_tx,
            store,
            wallet,
            done: Some(done_tx),
            last_checkpoint: Instant::now(),
        };
        tokio::spawn(async move {
            let step = actor.table.resume(Instant::now());
            actor.commit(step).await;
            actor.run().await;
        });
        (TableHandle { id, inbox: tx }, out_rx, done_rx)
    }

    async fn run(mut self) {
        let id = self.table.id();
        log::debug!("[actor {}] running", id);
        loop {
            let wake = self.next_wake();
            let msg = tokio::select! {
                biased;
                msg = self.inbox.recv() => match msg {
                    Some(msg) => msg,
                    None => break,
                },
                _ = tokio::time::sleep_until(wake) => Message::Tick,
            };
            let step = self.table.handle(msg, Instant::now());
            let closing = step.effects.iter().any(|e| matches!(e, Effect::Close));
            self.commit(step).await;
            if self.last_checkpoint.elapsed() >= CHECKPOINT_EVERY {
                self.checkpoint().await;
            }
            if closing {
                break;
            }
        }
        if let Some(done) = self.done.take() {
            let _ = done.send(id);
        }
        log::debug!("[actor {}] stopped", id);
    }

    /// The earliest of the table's own deadlines and the periodic
    /// checkpoint mark.
    fn next_wake(&self) -> Instant {
        let periodic = self.last_checkpoint + CHECKPOINT_EVERY;
        self.table
            .next_deadline()
            .map(|d| d.min(periodic))
            .unwrap_or(periodic)
    }

    /// Emits the step's events, then runs its effects. Ordering matters:
    /// state is already committed, broadcasts go out, persistence and
    /// collaborators follow.
    async fn commit(&mut self, step: Step) {
        for outbound in step.outbound {
            let _ = self.outbox.send(outbound);
        }
        for effect in step.effects {
            match effect {
                Effect::Checkpoint => self.checkpoint().await,
                Effect::Settle {
                    player,
                    escrow,
                    balance,
                } => {
                    if let Err(e) = self.wallet.settle(escrow, balance).await {
                        log::error!(
                            "[actor {}] settling {} for {} failed: {}",
                            self.table.id(),
                            escrow,
                            player,
                            e
                        );
                    }
                }
                Effect::Release { escrow } => {
                    if let Err(e) = self.wallet.release(escrow).await {
                        log::error!("[actor {}] release {} failed: {}", self.table.id(), escrow, e);
                    }
                }
                Effect::Record { record } => {
                    if let Err(e) = self
                        .store
                        .append_hand(record.id, record.table, record.to_value())
                        .await
                    {
                        log::error!("[actor {}] hand record failed: {}", self.table.id(), e);
                    }
                }
                Effect::Close => {}
            }
        }
    }

    /// Writes the checkpoint with bounded exponential backoff. When the
    /// budget is spent the table pauses new hands but keeps serving
    /// leaves, per the degraded-persistence policy.
    async fn checkpoint(&mut self) {
        let checkpoint = self.table.checkpoint();
        let id = self.table.id();
        let version = checkpoint.version;
        let state = serde_json::to_value(&checkpoint).expect("checkpoint serializes");
        let dedup = serde_json::to_value(&checkpoint.dedup).expect("dedup serializes");
        let mut delay = Duration::from_millis(100);
        for attempt in 0..CHECKPOINT_RETRIES {
            let result = match self.store.save_checkpoint(id, version, state.clone()).await {
                Ok(()) => self.store.save_dedup(id, dedup.clone()).await,
                Err(e) => Err(e),
            };
            match result {
                Ok(()) => {
                    self.last_checkpoint = Instant::now();
                    return;
                }
                Err(StoreError::Corrupt(e)) => {
                    log::error!("[actor {}] checkpoint corrupt: {}", id, e);
                    break;
                }
                Err(StoreError::Unavailable(e)) => {
                    log::warn!(
                        "[actor {}] checkpoint attempt {} failed: {}",
                        id,
                        attempt + 1,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
            }
        }
        log::error!("[actor {}] checkpointing failed, pausing new hands", id);
        self.table.pause();
        self.last_checkpoint = Instant::now();
    }
}
