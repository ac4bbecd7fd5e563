//! # buzz-core
//!
//! Pure logic for buzzline (no I/O, instant tests).
//!
//! This crate implements the history merge, channel state machine, join-code
//! allocation, and offline simulation decisions without any network or timer
//! I/O, enabling fast unit tests.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects. This enables:
//! - Instant unit tests (no mocks, no async)
//! - Deterministic behavior (same input → same output)
//! - Easy reasoning about state transitions
//!
//! The actual I/O (network, timers) is performed by `buzz-client`, which
//! drives these structures from its backends.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codes;
pub mod feed;
pub mod simulate;
pub mod state;

pub use codes::CodeRegistry;
pub use feed::{NotificationFeed, FEED_CAPACITY};
pub use simulate::{should_fire, synth_event, SimulatorConfig, PEER_MESSAGES, PEER_NAMES};
pub use state::{Action, ChannelEvent, ChannelState, StatusChange};
