use rvb_core::PlayerId;
use std::collections::HashMap;
use tokio::time::Instant;

/// Deadline tracking for the actor's scheduled work.
///
/// The actor sleeps until the earliest armed deadline and synthesizes a
/// tick; a deadline is implicitly cancelled by clearing or re-arming it.
/// Nothing here is persisted — timers re-arm after a restore.
#[derive(Debug, Default)]
pub struct Deadlines {
    action: Option<Instant>,
    settle: Option<Instant>,
    empty: Option<Instant>,
    disconnects: HashMap<PlayerId, Instant>,
}

impl Deadlines {
    pub fn arm_action(&mut self, at: Instant) {
        self.action = Some(at);
    }
    pub fn action_deadline(&self) -> Option<Instant> {
        self.action
    }
    pub fn clear_action(&mut self) {
        self.action = None;
    }
    pub fn action_expired(&self, now: Instant) -> bool {
        self.action.map(|d| now >= d).unwrap_or(false)
    }
    pub fn arm_settle(&mut self, at: Instant) {
        self.settle = Some(at);
    }
    pub fn clear_settle(&mut self) {
        self.settle = None;
    }
    pub fn settle_expired(&self, now: Instant) -> bool {
        self.settle.map(|d| now >= d).unwrap_or(false)
    }
    pub fn arm_empty(&mut self, at: Instant) {
        self.empty = Some(at);
    }
    pub fn clear_empty(&mut self) {
        self.empty = None;
    }
    pub fn empty_expired(&self, now: Instant) -> bool {
        self.empty.map(|d| now >= d).unwrap_or(false)
    }
    pub fn arm_disconnect(&mut self, player: PlayerId, at: Instant) {
        self.disconnects.insert(player, at);
    }
    pub fn clear_disconnect(&mut self, player: PlayerId) {
        self.disconnects.remove(&player);
    }
    pub fn disconnect_deadline(&self, player: PlayerId) -> Option<Instant> {
        self.disconnects.get(&player).copied()
    }
    /// Players whose reconnect grace has lapsed.
    pub fn lapsed_disconnects(&self, now: Instant) -> Vec<PlayerId> {
        self.disconnects
            .iter()
            .filter(|&(_, &d)| now >= d)
            .map(|(&p, _)| p)
            .collect()
    }
    /// Earliest armed deadline, for the actor's sleep.
    pub fn next(&self) -> Option<Instant> {
        [self.action, self.settle, self.empty]
            .into_iter()
            .flatten()
            .chain(self.disconnects.values().copied())
            .min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn earliest_deadline_wins() {
        let now = Instant::now();
        let mut deadlines = Deadlines::default();
        assert!(deadlines.next().is_none());
        deadlines.arm_action(now + Duration::from_secs(30));
        deadlines.arm_settle(now + Duration::from_secs(3));
        assert_eq!(deadlines.next(), Some(now + Duration::from_secs(3)));
        deadlines.clear_settle();
        assert_eq!(deadlines.next(), Some(now + Duration::from_secs(30)));
    }

    #[test]
    fn disconnects_lapse_individually() {
        let now = Instant::now();
        let (a, b) = (PlayerId::fresh(), PlayerId::fresh());
        let mut deadlines = Deadlines::default();
        deadlines.arm_disconnect(a, now + Duration::from_secs(1));
        deadlines.arm_disconnect(b, now + Duration::from_secs(60));
        let lapsed = deadlines.lapsed_disconnects(now + Duration::from_secs(2));
        assert_eq!(lapsed, vec![a]);
    }
}
