use super::session::Sessions;
use rvb_core::TableId;
use rvb_gameroom::Outbound;
use rvb_gameroom::Protocol;
use rvb_gameroom::ServerFrame;
use rvb_hosting::Floor;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

/// Drains one table's outbound stream into subscriber sockets.
///
/// Each event is resolved against the session registry, masked per
/// recipient, and framed with its state version. The lobby cache
/// observes the same stream so summaries stay fresh. The task ends when
/// the actor drops its sender.
pub fn spawn(
    table: TableId,
    mut outbound: UnboundedReceiver<Outbound>,
    sessions: Arc<Sessions>,
    floor: Arc<Floor>,
) {
    tokio::spawn(async move {
        log::debug!("[fanout {}] started", table);
        while let Some(out) = outbound.recv().await {
            floor.observe(table, &out.event).await;
            for (tx, viewer) in sessions.recipients(table, out.audience).await {
                if let Some(message) = Protocol::encode(&out.event, viewer) {
                    let frame = ServerFrame::new(message, out.version);
                    // a dead socket is cleaned up by its own task
                    let _ = tx.send(frame.to_json());
                }
            }
        }
        log::debug!("[fanout {}] ended", table);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Channel;
    use crate::session::Entry;
    use rvb_core::*;
    use rvb_database::Memory;
    use rvb_gameroom::*;
    use std::collections::HashSet;
    use tokio::sync::mpsc::unbounded_channel;

    #[tokio::test]
    async fn masks_per_recipient_on_the_way_out() {
        let sessions = Arc::new(Sessions::default());
        let floor = Arc::new(Floor::new(
            Arc::new(Memory::default()),
            Arc::new(Bankroll::new(1_000_000)),
        ));
        let table = TableId::fresh();
        let owner = PlayerId::fresh();
        let (owner_tx, mut owner_rx) = unbounded_channel();
        let (watcher_tx, mut watcher_rx) = unbounded_channel();
        sessions
            .insert(
                SessionId::fresh(),
                Entry {
                    player: owner,
                    name: "owner".into(),
                    admin: false,
                    tx: owner_tx,
                    channels: HashSet::from([Channel::Game(table)]),
                },
            )
            .await;
        sessions
            .insert(
                SessionId::fresh(),
                Entry {
                    player: PlayerId::fresh(),
                    name: "watcher".into(),
                    admin: false,
                    tx: watcher_tx,
                    channels: HashSet::from([Channel::Spectator(table)]),
                },
            )
            .await;
        let (tx, rx) = unbounded_channel();
        spawn(table, rx, sessions, floor);
        tx.send(Outbound {
            audience: Audience::Player(owner),
            version: Some(1),
            event: Event::HoleDealt {
                position: 0,
                player: owner,
                hole: rvb_cards::Hole::try_from("AsKd").unwrap(),
            },
        })
        .unwrap();
        let frame = tokio::time::timeout(std::time::Duration::from_secs(1), owner_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(frame.contains("AsKd"));
        // the spectator socket never hears about private cards
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(watcher_rx.try_recv().is_err());
    }
}
