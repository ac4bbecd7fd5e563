//! Authoritative group store abstraction.
//!
//! The realtime backend reads and writes a generic pub/sub table contract:
//! `groups(id, name, code)` and `notifications(id, group_id, sender_id,
//! sender_name, message, type, created_at)`, with change delivery defined
//! as "notify on insert into notifications filtered by group_id".
//!
//! Implementations: [`RestStore`] (HTTP) and [`MockStore`] (in-memory,
//! for tests).

mod http;
mod mock;

pub use http::RestStore;
pub use mock::MockStore;

use async_trait::async_trait;
use buzz_types::{Event, GroupId, JoinCode};
use thiserror::Error;
use tokio::sync::mpsc;

/// How many historical events are fetched when joining a group.
pub const JOIN_HISTORY_LIMIT: usize = 20;

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be constructed (bad URL, missing credentials).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A request failed at the transport level or returned an error status.
    #[error("request failed: {0}")]
    Request(String),

    /// A response could not be interpreted.
    #[error("unexpected response: {0}")]
    Malformed(String),

    /// The chosen join code is already taken; the caller should regenerate.
    #[error("join code already in use")]
    CodeTaken,
}

/// A group row from the authoritative store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRecord {
    /// Authoritative group id.
    pub id: GroupId,
    /// Group name.
    pub name: String,
    /// Join code registered for the group.
    pub code: JoinCode,
}

/// Trait over the authoritative pub/sub store.
#[async_trait]
pub trait GroupStore: Send + Sync {
    /// Insert a group row. Fails with [`StoreError::CodeTaken`] when the
    /// code collides with an active group.
    async fn create_group(&self, name: &str, code: &JoinCode) -> Result<GroupRecord, StoreError>;

    /// Look up a group by join code. `Ok(None)` means no such group.
    async fn find_group(&self, code: &JoinCode) -> Result<Option<GroupRecord>, StoreError>;

    /// Fetch the most recent events for a group, newest first.
    async fn recent_events(&self, group: GroupId, limit: usize)
        -> Result<Vec<Event>, StoreError>;

    /// Insert an event row. The event keeps its locally assigned id, so the
    /// echo delivered back to the originator deduplicates cleanly.
    async fn insert_event(&self, group: GroupId, event: &Event) -> Result<(), StoreError>;

    /// Open a change stream of inserted events filtered by group id,
    /// starting from the caller's history position (`created_at` millis).
    ///
    /// Events arrive in store-commit order. Implementations may redeliver
    /// events at or before `since_millis`; the consumer's idempotent merge
    /// absorbs duplicates, so over-delivery is always preferred over a
    /// dropped event. The stream ends when the receiver is dropped;
    /// implementations must not leak background work past that point.
    async fn open_stream(
        &self,
        group: GroupId,
        since_millis: u64,
    ) -> Result<mpsc::Receiver<Event>, StoreError>;
}
