//! Offline simulation decisions.
//!
//! The offline backend keeps a demo group feeling alive by periodically
//! synthesizing events from imaginary peers. This module holds the pure
//! parts of that: the peer pools and the fire decision. The timer itself
//! lives in buzz-client.

use buzz_types::{ActorId, Event, EventKind};

/// Names attributed to synthesized peers.
pub const PEER_NAMES: &[&str] = &["Alice", "Bob", "Charlie", "Diana"];

/// Message texts used for synthesized events.
pub const PEER_MESSAGES: &[&str] = &[
    "Where is everyone?",
    "Meeting starts in 5!",
    "Anyone want coffee?",
    "Check the doc I sent.",
    "Buzzzz!",
];

/// Tuning for the offline simulator.
#[derive(Debug, Clone, Copy)]
pub struct SimulatorConfig {
    /// Seconds between simulator ticks.
    pub tick_secs: u64,
    /// Chance (0.0-1.0) that a tick fires when the group has company.
    pub base_chance: f64,
    /// Membership below this always fires, to keep sparse groups lively.
    pub sparse_threshold: usize,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            tick_secs: 5,
            base_chance: 0.3,
            sparse_threshold: 2,
        }
    }
}

/// Decide whether a simulator tick produces an event.
///
/// `roll` is a uniform sample in [0, 1). Sparse groups always fire so a
/// lone member still sees activity; otherwise the base chance applies.
pub fn should_fire(member_count: usize, roll: f64, config: &SimulatorConfig) -> bool {
    member_count < config.sparse_threshold || roll < config.base_chance
}

/// Build a synthesized peer event from pool indices.
///
/// Indices are taken modulo the pool sizes, so any values are safe. The
/// sender id is freshly generated and can never collide with a real local
/// actor, which keeps echo suppression uniform.
pub fn synth_event(name_index: usize, message_index: usize, buzz: bool) -> Event {
    let name = PEER_NAMES[name_index % PEER_NAMES.len()];
    let text = PEER_MESSAGES[message_index % PEER_MESSAGES.len()];
    let kind = if buzz { EventKind::Buzz } else { EventKind::Message };
    Event::new(ActorId::new(), name, text, kind)
}
