//! In-process group backend with simulated peers.
//!
//! Groups live in an [`OfflineWorld`]: a caller-created, cloneable context
//! holding the group table and the join-code registry. Two channels built
//! over the same world can exchange events entirely in process, which is
//! also how the end-to-end tests run. Nothing here is process-global.

use super::{ChannelError, ChannelMode, EventListener, GroupBackend, GroupHandle, Subscription};
use crate::config::ActorProfile;
use async_trait::async_trait;
use buzz_core::{should_fire, synth_event, CodeRegistry, SimulatorConfig};
use buzz_types::{GroupId, JoinCode};
use dashmap::DashMap;
use rand::Rng;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::watch;

/// Shared context for offline groups.
///
/// Clones share state: a channel created from a clone sees the same groups
/// and codes as the original.
#[derive(Clone)]
pub struct OfflineWorld {
    groups: Arc<DashMap<GroupId, GroupHandle>>,
    codes: Arc<StdMutex<CodeRegistry>>,
    simulators: Arc<DashMap<GroupId, ()>>,
    simulator: SimulatorConfig,
}

impl OfflineWorld {
    /// Create an empty world with default simulator tuning.
    pub fn new() -> Self {
        Self::with_simulator(SimulatorConfig::default())
    }

    /// Create an empty world with explicit simulator tuning.
    pub fn with_simulator(simulator: SimulatorConfig) -> Self {
        Self {
            groups: Arc::new(DashMap::new()),
            codes: Arc::new(StdMutex::new(CodeRegistry::new())),
            simulators: Arc::new(DashMap::new()),
            simulator,
        }
    }

    /// Number of groups currently held.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Spawn the group's simulator unless one is already running.
    ///
    /// At most one simulator exists per group no matter how many
    /// subscriptions are open; it retires itself when the last listener
    /// leaves. The caller must have registered its listener already, so the
    /// retire check cannot race a fresh subscription to an empty set.
    fn ensure_simulator(&self, group: &GroupHandle) {
        if self.simulators.insert(group.id(), ()).is_none() {
            tokio::spawn(simulator_task(
                group.clone(),
                self.simulator,
                Arc::clone(&self.simulators),
            ));
        }
    }
}

impl Default for OfflineWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Offline [`GroupBackend`].
pub(super) struct OfflineBackend {
    world: OfflineWorld,
    actor: ActorProfile,
}

impl OfflineBackend {
    pub(super) fn new(world: OfflineWorld, actor: ActorProfile) -> Self {
        Self { world, actor }
    }
}

#[async_trait]
impl GroupBackend for OfflineBackend {
    fn mode(&self) -> ChannelMode {
        ChannelMode::Offline
    }

    async fn create(&self, name: &str) -> Result<GroupHandle, ChannelError> {
        let id = GroupId::new();
        let code = {
            let mut registry = self.world.codes.lock().unwrap();
            registry.allocate(&mut rand::thread_rng(), id)
        };
        let group = GroupHandle::new(id, name, code);
        group.add_member(self.actor.id);
        self.world.groups.insert(id, group.clone());
        Ok(group)
    }

    async fn join(&self, code: &JoinCode) -> Result<GroupHandle, ChannelError> {
        let id = {
            let registry = self.world.codes.lock().unwrap();
            registry.resolve(code)
        };
        let id = id.ok_or_else(|| ChannelError::NotFound(code.clone()))?;
        let group = self
            .world
            .groups
            .get(&id)
            .map(|entry| entry.clone())
            .ok_or_else(|| ChannelError::NotFound(code.clone()))?;
        group.add_member(self.actor.id);
        Ok(group)
    }

    async fn publish(
        &self,
        _group: &GroupHandle,
        _event: buzz_types::Event,
    ) -> Result<(), ChannelError> {
        // The channel already merged and announced the event, and offline
        // members share the group handle. Nothing to propagate.
        Ok(())
    }

    async fn subscribe(
        &self,
        group: &GroupHandle,
        listener: EventListener,
    ) -> Result<Subscription, ChannelError> {
        // Register the listener before ensuring the simulator; see
        // `ensure_simulator` for why the order matters.
        let listener_id = group.listeners().add(listener);
        self.world.ensure_simulator(group);
        // The simulator watches the listener count, not a per-subscription
        // signal; the stop channel here has no receiver.
        let (stop_tx, _stop_rx) = watch::channel(false);
        Ok(Subscription::new(
            listener_id,
            group.listeners().clone(),
            stop_tx,
        ))
    }
}

/// Periodically synthesize peer activity for one group.
///
/// One instance runs per group with at least one listener. The task retires
/// (removing its registry entry under the shard lock) as soon as the
/// listener count reaches zero; a tick in flight completes its merge before
/// the task exits.
async fn simulator_task(
    group: GroupHandle,
    config: SimulatorConfig,
    simulators: Arc<DashMap<GroupId, ()>>,
) {
    let mut ticker = tokio::time::interval(Duration::from_secs(config.tick_secs.max(1)));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick is immediate; swallow it so activity starts one full
    // period after subscribing.
    ticker.tick().await;

    let mut count = group.listeners().count_watch();
    loop {
        tokio::select! {
            biased;
            changed = count.changed() => {
                if changed.is_err() {
                    simulators.remove(&group.id());
                    break;
                }
                if retire_if_idle(&simulators, &group) {
                    break;
                }
            }
            _ = ticker.tick() => {
                if retire_if_idle(&simulators, &group) {
                    break;
                }
                let synthesized = {
                    let mut rng = rand::thread_rng();
                    let roll: f64 = rng.gen();
                    if should_fire(group.member_count(), roll, &config) {
                        Some(synth_event(rng.gen::<usize>(), rng.gen::<usize>(), rng.gen_bool(0.5)))
                    } else {
                        None
                    }
                };
                if let Some(event) = synthesized {
                    if group.merge(event.clone()).await {
                        group.listeners().notify(&event);
                    }
                }
            }
        }
    }
    tracing::debug!(group = %group.id(), "simulator stopped");
}

/// Remove the group's registry entry if its listener set is empty.
///
/// The check runs inside `remove_if`'s shard lock, so a concurrent
/// `ensure_simulator` either sees the entry still present (and spawns
/// nothing) or sees it gone (and spawns a fresh task).
fn retire_if_idle(simulators: &DashMap<GroupId, ()>, group: &GroupHandle) -> bool {
    simulators
        .remove_if(&group.id(), |_, _| group.listeners().len() == 0)
        .is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn backend(world: &OfflineWorld, name: &str) -> OfflineBackend {
        OfflineBackend::new(world.clone(), ActorProfile::new(name))
    }

    fn quiet() -> OfflineWorld {
        OfflineWorld::with_simulator(SimulatorConfig {
            tick_secs: 3600,
            base_chance: 0.0,
            sparse_threshold: 0,
        })
    }

    #[tokio::test]
    async fn created_groups_get_distinct_codes() {
        let world = quiet();
        let backend = backend(&world, "Ann");
        let mut seen = HashSet::new();

        for i in 0..50 {
            let group = backend.create(&format!("g{}", i)).await.unwrap();
            assert!(seen.insert(group.join_code().clone()));
        }
        assert_eq!(world.group_count(), 50);
    }

    #[tokio::test]
    async fn join_shares_the_same_group_state() {
        let world = quiet();
        let ann = backend(&world, "Ann");
        let bob = backend(&world, "Bob");

        let created = ann.create("Standup").await.unwrap();
        let joined = bob.join(created.join_code()).await.unwrap();

        assert_eq!(created.id(), joined.id());
        assert_eq!(created.member_count(), 2);
    }

    #[tokio::test]
    async fn unknown_code_is_not_found() {
        let world = quiet();
        let backend = backend(&world, "Ann");

        let result = backend.join(&JoinCode::parse("0001").unwrap()).await;
        assert!(matches!(result, Err(ChannelError::NotFound(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn simulator_produces_peer_activity() {
        // One member, so the sparse rule fires every tick.
        let world = OfflineWorld::with_simulator(SimulatorConfig {
            tick_secs: 1,
            base_chance: 0.0,
            sparse_threshold: 2,
        });
        let backend = backend(&world, "Ann");
        let group = backend.create("Standup").await.unwrap();

        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let _sub = backend
            .subscribe(
                &group,
                Arc::new(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(3500)).await;

        let fired = seen.load(Ordering::SeqCst);
        assert!(fired >= 3, "expected ticks to fire, saw {}", fired);
        assert_eq!(group.feed_len().await, fired);

        let head = group.feed_head().await.unwrap();
        assert!(buzz_core::PEER_NAMES.contains(&head.sender_name.as_str()));
    }

    #[tokio::test(start_paused = true)]
    async fn second_subscriber_does_not_double_the_tick_rate() {
        // One member, so the sparse rule fires on every tick.
        let world = OfflineWorld::with_simulator(SimulatorConfig {
            tick_secs: 1,
            base_chance: 0.0,
            sparse_threshold: 2,
        });
        let backend = backend(&world, "Ann");
        let group = backend.create("Standup").await.unwrap();

        let _first = backend.subscribe(&group, Arc::new(|_| {})).await.unwrap();
        let _second = backend.subscribe(&group, Arc::new(|_| {})).await.unwrap();

        tokio::time::sleep(Duration::from_millis(3500)).await;

        // One simulator per group: three ticks, three events, regardless of
        // how many subscriptions are open.
        assert_eq!(group.feed_len().await, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn simulator_survives_until_the_last_listener_leaves() {
        let world = OfflineWorld::with_simulator(SimulatorConfig {
            tick_secs: 1,
            base_chance: 0.0,
            sparse_threshold: 2,
        });
        let backend = backend(&world, "Ann");
        let group = backend.create("Standup").await.unwrap();

        let first = backend.subscribe(&group, Arc::new(|_| {})).await.unwrap();
        let second = backend.subscribe(&group, Arc::new(|_| {})).await.unwrap();

        first.cancel();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(group.feed_len().await >= 1);

        second.cancel();
        tokio::task::yield_now().await;
        let settled = group.feed_len().await;

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(group.feed_len().await, settled);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_subscription_stops_the_simulator() {
        let world = OfflineWorld::with_simulator(SimulatorConfig {
            tick_secs: 1,
            base_chance: 0.0,
            sparse_threshold: 2,
        });
        let backend = backend(&world, "Ann");
        let group = backend.create("Standup").await.unwrap();

        let sub = backend.subscribe(&group, Arc::new(|_| {})).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(group.feed_len().await >= 1);

        sub.cancel();
        tokio::task::yield_now().await;
        let settled = group.feed_len().await;

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(group.feed_len().await, settled);
    }

    #[tokio::test]
    async fn quiet_threshold_silences_populated_groups() {
        // Regression guard on the wiring: member_count reaches should_fire.
        let config = SimulatorConfig {
            tick_secs: 1,
            base_chance: 0.0,
            sparse_threshold: 2,
        };
        let world = OfflineWorld::with_simulator(config);
        let ann = backend(&world, "Ann");
        let bob = backend(&world, "Bob");

        let group = ann.create("Standup").await.unwrap();
        bob.join(group.join_code()).await.unwrap();

        assert!(!should_fire(group.member_count(), 0.5, &config));
    }
}
