//! In-memory group store for testing.
//!
//! Behaves like the authoritative store, including the echo: an inserted
//! event is delivered to every open stream for its group - the inserter's
//! own stream included.

use super::{GroupRecord, GroupStore, StoreError};
use async_trait::async_trait;
use buzz_types::{Event, GroupId, JoinCode};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// In-memory [`GroupStore`] implementation.
#[derive(Debug, Default)]
pub struct MockStore {
    inner: Arc<Mutex<MockStoreInner>>,
}

#[derive(Debug, Default)]
struct MockStoreInner {
    groups: Vec<GroupRecord>,
    events: HashMap<GroupId, Vec<Event>>,
    streams: HashMap<GroupId, Vec<mpsc::Sender<Event>>>,
    stream_opens: Vec<(GroupId, u64)>,
    fail_next: Option<String>,
}

impl MockStore {
    /// Create an empty mock store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cause the next store call to fail with the given reason.
    pub fn fail_next(&self, reason: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next = Some(reason.to_string());
    }

    /// All events stored for a group, oldest first.
    pub fn stored_events(&self, group: GroupId) -> Vec<Event> {
        let inner = self.inner.lock().unwrap();
        inner.events.get(&group).cloned().unwrap_or_default()
    }

    /// Number of groups created.
    pub fn group_count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.groups.len()
    }

    /// The `(group, since_millis)` pairs streams were opened with.
    pub fn stream_opens(&self) -> Vec<(GroupId, u64)> {
        let inner = self.inner.lock().unwrap();
        inner.stream_opens.clone()
    }

    fn take_failure(inner: &mut MockStoreInner) -> Result<(), StoreError> {
        if let Some(reason) = inner.fail_next.take() {
            return Err(StoreError::Request(reason));
        }
        Ok(())
    }
}

impl Clone for MockStore {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl GroupStore for MockStore {
    async fn create_group(&self, name: &str, code: &JoinCode) -> Result<GroupRecord, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        Self::take_failure(&mut inner)?;

        if inner.groups.iter().any(|g| &g.code == code) {
            return Err(StoreError::CodeTaken);
        }
        let record = GroupRecord {
            id: GroupId::new(),
            name: name.to_string(),
            code: code.clone(),
        };
        inner.groups.push(record.clone());
        Ok(record)
    }

    async fn find_group(&self, code: &JoinCode) -> Result<Option<GroupRecord>, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        Self::take_failure(&mut inner)?;

        Ok(inner.groups.iter().find(|g| &g.code == code).cloned())
    }

    async fn recent_events(
        &self,
        group: GroupId,
        limit: usize,
    ) -> Result<Vec<Event>, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        Self::take_failure(&mut inner)?;

        let mut events = inner.events.get(&group).cloned().unwrap_or_default();
        events.reverse(); // newest first
        events.truncate(limit);
        Ok(events)
    }

    async fn insert_event(&self, group: GroupId, event: &Event) -> Result<(), StoreError> {
        let senders = {
            let mut inner = self.inner.lock().unwrap();
            Self::take_failure(&mut inner)?;

            inner.events.entry(group).or_default().push(event.clone());
            inner.streams.get(&group).cloned().unwrap_or_default()
        };

        // Deliver to every open stream, the originator's included. Closed
        // streams are dropped on the next insert.
        let mut open = Vec::with_capacity(senders.len());
        for sender in senders {
            if sender.send(event.clone()).await.is_ok() {
                open.push(sender);
            }
        }
        let mut inner = self.inner.lock().unwrap();
        inner.streams.insert(group, open);
        Ok(())
    }

    async fn open_stream(
        &self,
        group: GroupId,
        since_millis: u64,
    ) -> Result<mpsc::Receiver<Event>, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        Self::take_failure(&mut inner)?;

        inner.stream_opens.push((group, since_millis));
        let (tx, rx) = mpsc::channel(64);
        inner.streams.entry(group).or_default().push(tx);
        Ok(rx)
    }
}
