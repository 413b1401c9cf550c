use super::event::Event;
use rvb_core::IDEMPOTENCY_WINDOW;
use rvb_core::PlayerId;
use std::collections::VecDeque;

/// Bounded per-player memory of accepted client message ids.
///
/// A duplicate id re-yields the original outcome without touching table
/// state or advancing the version. Only accepted actions are recorded;
/// rejected ones revalidate freely. Entries are Vec-backed so the whole
/// cache serializes into checkpoints as plain JSON.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Dedup {
    entries: Vec<DedupEntry>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct DedupEntry {
    player: PlayerId,
    seen: VecDeque<(String, Event)>,
}

impl Dedup {
    /// The recorded outcome of a previously accepted message, if any.
    pub fn seen(&self, player: PlayerId, client_id: &str) -> Option<&Event> {
        self.entries
            .iter()
            .find(|e| e.player == player)
            .and_then(|e| e.seen.iter().find(|(id, _)| id == client_id))
            .map(|(_, outcome)| outcome)
    }
    /// Records an accepted message and its outcome, evicting the oldest
    /// entry past the retention window.
    pub fn record(&mut self, player: PlayerId, client_id: String, outcome: Event) {
        let entry = match self.entries.iter_mut().find(|e| e.player == player) {
            Some(entry) => entry,
            None => {
                self.entries.push(DedupEntry {
                    player,
                    seen: VecDeque::new(),
                });
                self.entries.last_mut().expect("just pushed")
            }
        };
        entry.seen.push_back((client_id, outcome));
        while entry.seen.len() > IDEMPOTENCY_WINDOW {
            entry.seen.pop_front();
        }
    }
    /// Drops a player's history when their seat is vacated.
    pub fn forget(&mut self, player: PlayerId) {
        self.entries.retain(|e| e.player != player);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(tag: &str) -> Event {
        Event::error("x", tag)
    }

    #[test]
    fn duplicate_yields_original_outcome() {
        let mut dedup = Dedup::default();
        let player = PlayerId::fresh();
        assert!(dedup.seen(player, "m1").is_none());
        dedup.record(player, "m1".into(), outcome("first"));
        assert_eq!(dedup.seen(player, "m1"), Some(&outcome("first")));
        assert!(dedup.seen(player, "m2").is_none());
        assert!(dedup.seen(PlayerId::fresh(), "m1").is_none());
    }

    #[test]
    fn window_is_bounded() {
        let mut dedup = Dedup::default();
        let player = PlayerId::fresh();
        for i in 0..IDEMPOTENCY_WINDOW + 10 {
            dedup.record(player, format!("m{}", i), outcome("ok"));
        }
        assert!(dedup.seen(player, "m0").is_none());
        let last = format!("m{}", IDEMPOTENCY_WINDOW + 9);
        assert!(dedup.seen(player, &last).is_some());
    }

    #[test]
    fn roundtrips_serde() {
        let mut dedup = Dedup::default();
        dedup.record(PlayerId::fresh(), "m1".into(), outcome("ok"));
        let json = serde_json::to_value(&dedup).unwrap();
        let back: Dedup = serde_json::from_value(json).unwrap();
        assert_eq!(back.entries.len(), 1);
    }
}
