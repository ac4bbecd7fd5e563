//! Group notification events.

use crate::ids::{ActorId, EventId};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// The kind of a group event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A short, attention-getting notification.
    Buzz,
    /// A regular text message.
    Message,
    /// A system-generated event (e.g. membership changes).
    System,
}

/// A single notification event within a group.
///
/// Immutable once created. The id is assigned by whichever side originates
/// the event, so deduplication works regardless of arrival order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Globally unique event identifier.
    pub id: EventId,
    /// The actor who sent the event.
    pub sender_id: ActorId,
    /// Display name of the sender at send time.
    pub sender_name: String,
    /// The message text.
    pub text: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    /// What kind of event this is.
    pub kind: EventKind,
}

impl Event {
    /// Create a new event of the given kind, stamped with the current time.
    pub fn new(sender_id: ActorId, sender_name: &str, text: &str, kind: EventKind) -> Self {
        Self {
            id: EventId::new(),
            sender_id,
            sender_name: sender_name.to_string(),
            text: text.to_string(),
            timestamp: now_millis(),
            kind,
        }
    }

    /// Create a buzz event.
    pub fn buzz(sender_id: ActorId, sender_name: &str, text: &str) -> Self {
        Self::new(sender_id, sender_name, text, EventKind::Buzz)
    }

    /// Create a message event.
    pub fn message(sender_id: ActorId, sender_name: &str, text: &str) -> Self {
        Self::new(sender_id, sender_name, text, EventKind::Message)
    }

    /// Create a system event.
    pub fn system(sender_id: ActorId, sender_name: &str, text: &str) -> Self {
        Self::new(sender_id, sender_name, text, EventKind::System)
    }
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_get_unique_ids() {
        let sender = ActorId::new();
        let a = Event::buzz(sender, "Ann", "hey");
        let b = Event::buzz(sender, "Ann", "hey");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn constructors_set_kind() {
        let sender = ActorId::new();
        assert_eq!(Event::buzz(sender, "a", "b").kind, EventKind::Buzz);
        assert_eq!(Event::message(sender, "a", "b").kind, EventKind::Message);
        assert_eq!(Event::system(sender, "a", "b").kind, EventKind::System);
    }

    #[test]
    fn event_is_timestamped() {
        let event = Event::buzz(ActorId::new(), "Ann", "hey");
        // Sanity: after 2020-01-01 in milliseconds
        assert!(event.timestamp > 1_577_836_800_000);
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&EventKind::Buzz).unwrap();
        assert_eq!(json, "\"buzz\"");
        let back: EventKind = serde_json::from_str("\"message\"").unwrap();
        assert_eq!(back, EventKind::Message);
    }
}
