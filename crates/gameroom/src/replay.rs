use super::event::Event;
use super::event::Outbound;
use rvb_core::REPLAY_WINDOW;
use rvb_core::Version;
use std::collections::VecDeque;

/// Ring of recent versioned broadcasts for reconnect catch-up.
///
/// A reconnecting client names its `last_seen_version`; if that version
/// is still in the window we replay everything after it, otherwise the
/// caller falls back to a full snapshot.
#[derive(Debug, Clone, Default)]
pub struct Replay {
    ring: VecDeque<Outbound>,
}

impl Replay {
    pub fn push(&mut self, outbound: Outbound) {
        debug_assert!(outbound.version.is_some());
        self.ring.push_back(outbound);
        while self.ring.len() > REPLAY_WINDOW {
            self.ring.pop_front();
        }
    }
    /// Broadcasts after `last_seen`, or `None` if the window has moved on.
    pub fn since(&self, last_seen: Version) -> Option<Vec<&Outbound>> {
        let oldest = self.ring.front().and_then(|o| o.version)?;
        if last_seen + 1 < oldest {
            return None;
        }
        Some(
            self.ring
                .iter()
                .filter(|o| o.version.map(|v| v > last_seen).unwrap_or(false))
                .collect(),
        )
    }
    pub fn latest(&self) -> Option<Version> {
        self.ring.back().and_then(|o| o.version)
    }
}
