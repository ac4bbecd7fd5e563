//! Group channels: create/join/publish/subscribe over two backends.
//!
//! A [`GroupChannel`] is the synchronization unit for one actor's group
//! session. It is capability-polymorphic over [`GroupBackend`]:
//! [`offline::OfflineBackend`] keeps everything in-process and simulates
//! peers, [`realtime::RealtimeBackend`] talks to the authoritative store.
//! Call sites never branch on mode.
//!
//! # Merge point
//!
//! Each group's history lives behind one async mutex inside its
//! [`GroupHandle`]. Optimistic publishes, stream deliveries, and simulator
//! ticks all merge through it, and [`buzz_core::NotificationFeed`]'s
//! id-idempotent insert guarantees no double entry regardless of the race
//! between a foreground publish and its arriving echo.

pub mod offline;
pub mod realtime;

pub use offline::OfflineWorld;

use crate::config::ChannelConfig;
use crate::store::{GroupStore, RestStore, StoreError};
use async_trait::async_trait;
use buzz_core::{ChannelEvent, ChannelState, NotificationFeed};
use buzz_types::{ActorId, Event, EventKind, GroupId, JoinCode};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use thiserror::Error;
use tokio::sync::{watch, Mutex};

use crate::config::ActorProfile;

/// Channel errors. All are local and recoverable; nothing here terminates
/// the process.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// No group matches the supplied join code.
    #[error("no group matches join code {0}")]
    NotFound(JoinCode),

    /// The remote backend could not be constructed or reached.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// An authoritative store operation failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Which backend a channel was constructed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelMode {
    /// Local simulation, no network.
    Offline,
    /// Authoritative pub/sub store.
    Realtime,
}

/// Callback invoked for user-visible events.
pub type EventListener = Arc<dyn Fn(&Event) + Send + Sync>;

/// Registry of listeners attached to one group.
///
/// Publishes its size through a watch channel so background tasks (the
/// offline simulator) can retire promptly when the last listener leaves.
#[derive(Clone, Default)]
pub(crate) struct ListenerSet {
    inner: Arc<StdMutex<ListenerSetInner>>,
}

struct ListenerSetInner {
    next_id: u64,
    listeners: HashMap<u64, EventListener>,
    count_tx: watch::Sender<usize>,
}

impl Default for ListenerSetInner {
    fn default() -> Self {
        let (count_tx, _) = watch::channel(0);
        Self {
            next_id: 0,
            listeners: HashMap::new(),
            count_tx,
        }
    }
}

impl ListenerSet {
    pub(crate) fn add(&self, listener: EventListener) -> u64 {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.listeners.insert(id, listener);
        let count = inner.listeners.len();
        inner.count_tx.send_replace(count);
        id
    }

    pub(crate) fn remove(&self, id: u64) {
        let mut inner = self.inner.lock().unwrap();
        inner.listeners.remove(&id);
        let count = inner.listeners.len();
        inner.count_tx.send_replace(count);
    }

    pub(crate) fn count_watch(&self) -> watch::Receiver<usize> {
        let inner = self.inner.lock().unwrap();
        inner.count_tx.subscribe()
    }

    pub(crate) fn notify(&self, event: &Event) {
        // Snapshot under the lock, invoke outside it.
        let snapshot: Vec<EventListener> = {
            let inner = self.inner.lock().unwrap();
            inner.listeners.values().cloned().collect()
        };
        for listener in snapshot {
            listener(event);
        }
    }

    pub(crate) fn len(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.listeners.len()
    }
}

/// A live view of one group: identity, membership, and history.
///
/// Cloning the handle shares state; on the offline backend every member of
/// a group holds the same underlying handle.
#[derive(Clone)]
pub struct GroupHandle {
    inner: Arc<GroupHandleInner>,
}

struct GroupHandleInner {
    id: GroupId,
    name: String,
    code: JoinCode,
    members: StdMutex<HashSet<ActorId>>,
    feed: Mutex<NotificationFeed>,
    listeners: ListenerSet,
}

impl GroupHandle {
    pub(crate) fn new(id: GroupId, name: &str, code: JoinCode) -> Self {
        Self {
            inner: Arc::new(GroupHandleInner {
                id,
                name: name.to_string(),
                code,
                members: StdMutex::new(HashSet::new()),
                feed: Mutex::new(NotificationFeed::new()),
                listeners: ListenerSet::default(),
            }),
        }
    }

    /// The group's id.
    pub fn id(&self) -> GroupId {
        self.inner.id
    }

    /// The group's name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The group's join code.
    pub fn join_code(&self) -> &JoinCode {
        &self.inner.code
    }

    /// Number of known members.
    pub fn member_count(&self) -> usize {
        self.inner.members.lock().unwrap().len()
    }

    /// A read-only snapshot of the feed, newest first.
    pub async fn feed(&self) -> Vec<Event> {
        self.inner.feed.lock().await.snapshot()
    }

    /// The most recent event, if any.
    pub async fn feed_head(&self) -> Option<Event> {
        self.inner.feed.lock().await.head().cloned()
    }

    /// Number of events currently held.
    pub async fn feed_len(&self) -> usize {
        self.inner.feed.lock().await.len()
    }

    pub(crate) fn add_member(&self, actor: ActorId) {
        self.inner.members.lock().unwrap().insert(actor);
    }

    /// Merge an event through the group's single synchronization point.
    ///
    /// Returns whether the event was new.
    pub(crate) async fn merge(&self, event: Event) -> bool {
        self.inner.feed.lock().await.insert(event)
    }

    pub(crate) async fn seed_history(&self, newest_first: Vec<Event>) {
        let mut feed = self.inner.feed.lock().await;
        feed.seed(newest_first.into_iter().rev());
    }

    pub(crate) fn listeners(&self) -> &ListenerSet {
        &self.inner.listeners
    }
}

impl std::fmt::Debug for GroupHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupHandle")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("code", &self.inner.code)
            .finish()
    }
}

/// Handle returned by `subscribe`; cancelling it tears down the backend
/// listener and stops future callback invocations.
///
/// Cancellation is idempotent. Callbacks already in flight when `cancel`
/// is called still complete, so a merge is never torn mid-way; the caller
/// simply ignores them if the group was dropped. The subscription also
/// cancels itself when dropped.
pub struct Subscription {
    cancelled: AtomicBool,
    listener_id: u64,
    listeners: ListenerSet,
    stop: watch::Sender<bool>,
    state: Option<Arc<StdMutex<ChannelState>>>,
}

impl Subscription {
    pub(crate) fn new(listener_id: u64, listeners: ListenerSet, stop: watch::Sender<bool>) -> Self {
        Self {
            cancelled: AtomicBool::new(false),
            listener_id,
            listeners,
            stop,
            state: None,
        }
    }

    fn with_state(mut self, state: Arc<StdMutex<ChannelState>>) -> Self {
        self.state = Some(state);
        self
    }

    /// Tear down the listener. Safe to call any number of times.
    pub fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        self.listeners.remove(self.listener_id);
        // Signal the background task; it drains its current iteration and
        // exits rather than being aborted mid-merge.
        let _ = self.stop.send(true);
        if let Some(state) = &self.state {
            let mut guard = state.lock().unwrap();
            let (next, _actions) = guard.clone().on_event(ChannelEvent::UnsubscribeRequested);
            *guard = next;
        }
        tracing::debug!("subscription cancelled");
    }

    /// Check whether this subscription was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Trait over the two channel backends.
#[async_trait]
pub trait GroupBackend: Send + Sync {
    /// Which mode this backend implements.
    fn mode(&self) -> ChannelMode;

    /// Create a group and register its join code.
    async fn create(&self, name: &str) -> Result<GroupHandle, ChannelError>;

    /// Join an existing group by code.
    async fn join(&self, code: &JoinCode) -> Result<GroupHandle, ChannelError>;

    /// Propagate an already-merged event to other members.
    async fn publish(&self, group: &GroupHandle, event: Event) -> Result<(), ChannelError>;

    /// Open the backend listener for a group.
    async fn subscribe(
        &self,
        group: &GroupHandle,
        listener: EventListener,
    ) -> Result<Subscription, ChannelError>;
}

/// One actor's group session.
///
/// Created explicitly by the caller, used, and torn down by cancelling its
/// subscriptions; no ambient global session exists.
pub struct GroupChannel {
    actor: ActorProfile,
    backend: Arc<dyn GroupBackend>,
    state: Arc<StdMutex<ChannelState>>,
}

impl GroupChannel {
    /// Construct a channel from configuration.
    ///
    /// Selects the realtime backend when store credentials are present and
    /// usable; otherwise falls back to offline mode. Backend
    /// unavailability is never fatal - the group feature stays usable in
    /// demo form.
    pub fn connect(config: ChannelConfig, world: &OfflineWorld) -> Self {
        if let Some(store_config) = &config.store {
            match RestStore::new(store_config) {
                Ok(store) => {
                    tracing::info!("group channel in realtime mode");
                    return Self::realtime(config.actor, Arc::new(store));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "group store unavailable, falling back to offline mode");
                }
            }
        }
        Self::offline(config.actor, world)
    }

    /// Construct an offline channel in the given world.
    pub fn offline(actor: ActorProfile, world: &OfflineWorld) -> Self {
        let backend = offline::OfflineBackend::new(world.clone(), actor.clone());
        Self {
            actor,
            backend: Arc::new(backend),
            state: Arc::new(StdMutex::new(ChannelState::new())),
        }
    }

    /// Construct a realtime channel over any [`GroupStore`].
    pub fn realtime(actor: ActorProfile, store: Arc<dyn GroupStore>) -> Self {
        let backend = realtime::RealtimeBackend::new(store, actor.clone());
        Self {
            actor,
            backend: Arc::new(backend),
            state: Arc::new(StdMutex::new(ChannelState::new())),
        }
    }

    /// Which backend this channel runs on.
    pub fn mode(&self) -> ChannelMode {
        self.backend.mode()
    }

    /// The local actor.
    pub fn actor(&self) -> &ActorProfile {
        &self.actor
    }

    /// Current subscription state.
    pub fn state(&self) -> ChannelState {
        self.state.lock().unwrap().clone()
    }

    /// Create a group.
    pub async fn create(&self, name: &str) -> Result<GroupHandle, ChannelError> {
        let group = self.backend.create(name).await?;
        tracing::info!(group = %group.id(), code = %group.join_code(), "group created");
        Ok(group)
    }

    /// Join a group by code. Unknown codes are a non-fatal
    /// [`ChannelError::NotFound`]; no group is created.
    pub async fn join(&self, code: &JoinCode) -> Result<GroupHandle, ChannelError> {
        let group = self.backend.join(code).await?;
        tracing::info!(group = %group.id(), "group joined");
        Ok(group)
    }

    /// Publish an event to the group.
    ///
    /// The event is merged into local history and announced to listeners
    /// immediately (the optimistic path), then handed to the backend. When
    /// the realtime store later echoes it back, the id-idempotent merge
    /// absorbs the duplicate and listeners are not re-invoked.
    pub async fn publish(
        &self,
        group: &GroupHandle,
        kind: EventKind,
        text: &str,
    ) -> Result<Event, ChannelError> {
        let event = Event::new(self.actor.id, &self.actor.name, text, kind);
        if group.merge(event.clone()).await {
            group.listeners().notify(&event);
        }
        self.backend.publish(group, event.clone()).await?;
        Ok(event)
    }

    /// Publish a buzz event.
    pub async fn publish_buzz(&self, group: &GroupHandle, text: &str) -> Result<Event, ChannelError> {
        self.publish(group, EventKind::Buzz, text).await
    }

    /// Publish a message event.
    pub async fn publish_message(
        &self,
        group: &GroupHandle,
        text: &str,
    ) -> Result<Event, ChannelError> {
        self.publish(group, EventKind::Message, text).await
    }

    /// Subscribe to a group's events.
    ///
    /// Opens the backend listener (change stream or simulator timer) and
    /// invokes `on_event` for incoming events. The returned handle is the
    /// only way to tear the listener down.
    pub async fn subscribe<F>(
        &self,
        group: &GroupHandle,
        on_event: F,
    ) -> Result<Subscription, ChannelError>
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.apply(ChannelEvent::SubscribeRequested);
        match self.backend.subscribe(group, Arc::new(on_event)).await {
            Ok(subscription) => {
                self.apply(ChannelEvent::ListenerReady);
                Ok(subscription.with_state(Arc::clone(&self.state)))
            }
            Err(e) => {
                self.apply(ChannelEvent::ListenerFailed {
                    reason: e.to_string(),
                });
                self.apply(ChannelEvent::TeardownComplete);
                Err(e)
            }
        }
    }

    fn apply(&self, event: ChannelEvent) {
        let mut guard = self.state.lock().unwrap();
        let (next, _actions) = guard.clone().on_event(event);
        *guard = next;
    }
}
