//! Live-region text for assistive technology.
//!
//! Move messages are debounced: only the latest one is published once the
//! hover has been still for the debounce window. Everything else is published
//! immediately and supersedes a pending move.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

const HISTORY_LEN: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Politeness {
    #[default]
    Polite,
    Assertive,
}

/// Current contents of the live region
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LiveRegion {
    pub text: String,
    pub politeness: Politeness,
    /// The whole region is re-read on every change
    pub atomic: bool,
    /// Increments on every publish, even when the text repeats
    pub sequence: u64,
}

/// Message templates, in terms of display names and 1-based positions
pub mod messages {
    pub fn picked_up(name: &str, position: usize, count: usize) -> String {
        format!("Picked up {name}. Current position {position} of {count}.")
    }

    /// `neighbour` is `(name, is_before)` for the row adjacent in the
    /// projected order
    pub fn moved(name: &str, position: usize, count: usize, neighbour: Option<(&str, bool)>) -> String {
        match neighbour {
            Some((other, true)) => format!("{name} moved to position {position} of {count}, before {other}."),
            Some((other, false)) => format!("{name} moved to position {position} of {count}, after {other}."),
            None => format!("{name} moved to position {position} of {count}."),
        }
    }

    pub fn returned(name: &str, position: usize, count: usize) -> String {
        format!("{name} is back at its original position {position} of {count}.")
    }

    pub fn dropped(name: &str, position: usize, count: usize) -> String {
        format!("{name} dropped at position {position} of {count}.")
    }

    pub fn cancelled(name: &str, position: usize) -> String {
        format!("Reorder cancelled. {name} returned to position {position}.")
    }

    pub fn removed_pending_undo(name: &str, seconds: u64) -> String {
        format!("{name} removed from lineup. Undo available for {seconds} seconds.")
    }

    pub fn restored(name: &str) -> String {
        format!("{name} restored to lineup.")
    }

    pub fn enabled(name: &str) -> String {
        format!("{name} enabled.")
    }
}

#[derive(Debug, Clone)]
pub struct Announcer {
    region: LiveRegion,
    debounce: Duration,
    pending: Option<(String, Instant)>,
    history: VecDeque<String>,
}

impl Announcer {
    pub fn new(debounce: Duration) -> Self {
        Self {
            region: LiveRegion {
                atomic: true,
                ..LiveRegion::default()
            },
            debounce,
            pending: None,
            history: VecDeque::with_capacity(HISTORY_LEN),
        }
    }

    pub fn region(&self) -> &LiveRegion {
        &self.region
    }

    pub fn history(&self) -> impl Iterator<Item = &str> {
        self.history.iter().map(String::as_str)
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Publish immediately, dropping any pending move message
    pub fn announce(&mut self, text: impl Into<String>) {
        self.pending = None;
        self.publish(text.into());
    }

    /// Queue a move message; it replaces any earlier pending one
    pub fn announce_move(&mut self, text: impl Into<String>, now: Instant) {
        if self.debounce.is_zero() {
            self.announce(text);
            return;
        }
        self.pending = Some((text.into(), now));
    }

    /// Publish the pending move message once it has settled
    pub fn tick(&mut self, now: Instant) {
        let settled = matches!(
            &self.pending,
            Some((_, queued)) if now.saturating_duration_since(*queued) >= self.debounce
        );
        if settled {
            if let Some((text, _)) = self.pending.take() {
                self.publish(text);
            }
        }
    }

    pub fn clear(&mut self) {
        self.pending = None;
        self.region.text.clear();
    }

    fn publish(&mut self, text: String) {
        tracing::debug!(announcement = %text, "live region");
        if self.history.len() >= HISTORY_LEN {
            self.history.pop_front();
        }
        self.history.push_back(text.clone());
        self.region.text = text;
        self.region.sequence = self.region.sequence.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn immediate_announcements_publish_now() {
        let mut announcer = Announcer::new(Duration::from_millis(300));
        announcer.announce(messages::picked_up("BBC One", 2, 10));
        assert_eq!(announcer.region().text, "Picked up BBC One. Current position 2 of 10.");
        assert!(announcer.region().atomic);
        assert_eq!(announcer.region().politeness, Politeness::Polite);
    }

    #[test]
    fn rapid_moves_collapse_to_latest() {
        let t0 = Instant::now();
        let mut announcer = Announcer::new(Duration::from_millis(300));
        for (i, ms) in [0u64, 50, 100, 150].iter().enumerate() {
            announcer.announce_move(format!("move {i}"), t0 + Duration::from_millis(*ms));
            announcer.tick(t0 + Duration::from_millis(*ms));
        }
        assert!(announcer.region().text.is_empty());

        announcer.tick(t0 + Duration::from_millis(449));
        assert!(announcer.region().text.is_empty());
        announcer.tick(t0 + Duration::from_millis(450));
        assert_eq!(announcer.region().text, "move 3");
        assert_eq!(announcer.history().count(), 1);
    }

    #[test]
    fn drop_supersedes_pending_move() {
        let t0 = Instant::now();
        let mut announcer = Announcer::new(Duration::from_millis(300));
        announcer.announce_move("moving", t0);
        announcer.announce(messages::dropped("CNN", 1, 3));
        announcer.tick(t0 + Duration::from_secs(1));
        assert_eq!(announcer.region().text, "CNN dropped at position 1 of 3.");
        assert!(!announcer.history().any(|h| h == "moving"));
    }

    #[test]
    fn zero_debounce_publishes_moves_directly() {
        let mut announcer = Announcer::new(Duration::ZERO);
        announcer.announce_move("now", Instant::now());
        assert_eq!(announcer.region().text, "now");
    }

    #[test]
    fn history_is_bounded() {
        let mut announcer = Announcer::new(Duration::ZERO);
        for i in 0..50 {
            announcer.announce(format!("msg {i}"));
        }
        assert_eq!(announcer.history().count(), HISTORY_LEN);
        assert_eq!(announcer.history().next(), Some("msg 30"));
        assert_eq!(announcer.region().sequence, 50);
    }

    #[test]
    fn move_message_names_neighbour() {
        assert_eq!(
            messages::moved("ESPN", 3, 8, Some(("Fox", false))),
            "ESPN moved to position 3 of 8, after Fox."
        );
        assert_eq!(
            messages::moved("ESPN", 1, 8, Some(("Fox", true))),
            "ESPN moved to position 1 of 8, before Fox."
        );
    }
}
