//! Deduplicated, capped event history.
//!
//! The feed is the single place group history is mutated. Optimistic local
//! publishes, backend stream deliveries, and simulator ticks all funnel
//! through [`NotificationFeed::insert`], which is idempotent on event id.
//! That makes the merge correct regardless of origin or arrival-order
//! duplication: a remote echo of a locally published event is a no-op.

use buzz_types::{Event, EventId};
use std::collections::{HashSet, VecDeque};

/// Maximum number of events retained per group.
pub const FEED_CAPACITY: usize = 50;

/// Most-recent-first event history for one group.
#[derive(Debug, Clone, Default)]
pub struct NotificationFeed {
    /// Events, newest at the front.
    events: VecDeque<Event>,
    /// Ids currently present, for O(1) duplicate checks.
    seen: HashSet<EventId>,
}

impl NotificationFeed {
    /// Create an empty feed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge an event into the feed.
    ///
    /// Returns `true` if the event was new, `false` if an event with the same
    /// id was already present (the duplicate is silently absorbed). When the
    /// feed exceeds [`FEED_CAPACITY`], the oldest entry is evicted.
    pub fn insert(&mut self, event: Event) -> bool {
        if !self.seen.insert(event.id) {
            return false;
        }
        self.events.push_front(event);
        if self.events.len() > FEED_CAPACITY {
            if let Some(evicted) = self.events.pop_back() {
                self.seen.remove(&evicted.id);
            }
        }
        true
    }

    /// Seed the feed from a batch of historical events, oldest first.
    ///
    /// Used when joining a group whose store already holds recent history.
    /// Duplicates are skipped like any other insert.
    pub fn seed<I: IntoIterator<Item = Event>>(&mut self, history: I) {
        for event in history {
            self.insert(event);
        }
    }

    /// The most recent event, if any.
    pub fn head(&self) -> Option<&Event> {
        self.events.front()
    }

    /// Check whether an event id is already present.
    pub fn contains(&self, id: &EventId) -> bool {
        self.seen.contains(id)
    }

    /// Iterate events, newest first.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    /// Number of events currently held.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if the feed is empty.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Clone the current events into a Vec, newest first.
    ///
    /// This is the read-only view handed to UI layers.
    pub fn snapshot(&self) -> Vec<Event> {
        self.events.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use buzz_types::ActorId;

    fn make_event(text: &str) -> Event {
        Event::buzz(ActorId::new(), "Peer", text)
    }

    #[test]
    fn insert_places_newest_at_head() {
        let mut feed = NotificationFeed::new();
        feed.insert(make_event("first"));
        feed.insert(make_event("second"));

        assert_eq!(feed.len(), 2);
        assert_eq!(feed.head().unwrap().text, "second");
    }

    #[test]
    fn duplicate_insert_is_noop() {
        let mut feed = NotificationFeed::new();
        let event = make_event("hello");

        assert!(feed.insert(event.clone()));
        assert!(!feed.insert(event));
        assert_eq!(feed.len(), 1);
    }

    #[test]
    fn capacity_evicts_oldest() {
        let mut feed = NotificationFeed::new();
        let oldest = make_event("event 0");
        let oldest_id = oldest.id;
        feed.insert(oldest);
        for i in 1..=FEED_CAPACITY {
            feed.insert(make_event(&format!("event {}", i)));
        }

        assert_eq!(feed.len(), FEED_CAPACITY);
        assert!(!feed.contains(&oldest_id));
        assert_eq!(feed.head().unwrap().text, format!("event {}", FEED_CAPACITY));
    }

    #[test]
    fn evicted_id_can_be_reinserted() {
        let mut feed = NotificationFeed::new();
        let first = make_event("evict me");
        feed.insert(first.clone());
        for i in 0..FEED_CAPACITY {
            feed.insert(make_event(&format!("filler {}", i)));
        }
        assert!(!feed.contains(&first.id));

        // Once evicted, the id is forgotten and may be merged again.
        assert!(feed.insert(first));
    }

    #[test]
    fn seed_skips_duplicates() {
        let mut feed = NotificationFeed::new();
        let shared = make_event("shared");
        feed.insert(shared.clone());

        feed.seed(vec![make_event("other"), shared]);

        assert_eq!(feed.len(), 2);
    }

    #[test]
    fn snapshot_is_newest_first() {
        let mut feed = NotificationFeed::new();
        feed.insert(make_event("a"));
        feed.insert(make_event("b"));

        let view = feed.snapshot();
        assert_eq!(view[0].text, "b");
        assert_eq!(view[1].text, "a");
    }

    #[test]
    fn empty_feed_has_no_head() {
        let feed = NotificationFeed::new();
        assert!(feed.head().is_none());
        assert!(feed.is_empty());
    }
}
