//! Concurrent fan-out dispatch to push relay endpoints.
//!
//! [`BuzzDispatcher::dispatch`] issues one relay push per target, all
//! concurrently, and aggregates the per-target outcomes. One target's
//! failure never aborts or delays the others; the call returns only after
//! every attempt has settled. There is no automatic retry - the caller
//! decides what to do with the report.

use crate::relay::{PushRelay, PushRequest};
use buzz_types::{ActorId, Target};
use futures_util::future::join_all;
use thiserror::Error;

/// Dispatch errors surfaced before any network activity.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The caller supplied an empty target list.
    #[error("no targets selected")]
    NoTargets,
}

/// A single failed delivery within a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryFailure {
    /// Which target failed.
    pub target_id: ActorId,
    /// Display name, for human-readable summaries.
    pub display_name: String,
    /// Why the delivery failed.
    pub reason: String,
}

/// Aggregate result of one dispatch batch.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Number of targets whose push settled without transport error.
    pub succeeded: usize,
    /// Per-target failures, in no particular order.
    pub failed: Vec<DeliveryFailure>,
}

impl BatchReport {
    /// Check whether every target was reached.
    pub fn all_delivered(&self) -> bool {
        self.failed.is_empty()
    }

    /// Total attempts made (succeeded + failed).
    pub fn attempted(&self) -> usize {
        self.succeeded + self.failed.len()
    }

    /// Human-readable summary, e.g. `2 succeeded, 1 failed: Bob`.
    pub fn summary(&self) -> String {
        if self.failed.is_empty() {
            format!("{} succeeded", self.succeeded)
        } else {
            let names: Vec<&str> = self.failed.iter().map(|f| f.display_name.as_str()).collect();
            format!(
                "{} succeeded, {} failed: {}",
                self.succeeded,
                self.failed.len(),
                names.join(", ")
            )
        }
    }
}

/// Fans a message out to many relay endpoints concurrently.
///
/// Stateless apart from the relay client; reads and writes no persisted
/// state.
#[derive(Debug, Clone)]
pub struct BuzzDispatcher<R: PushRelay> {
    relay: R,
}

impl<R: PushRelay> BuzzDispatcher<R> {
    /// Create a dispatcher over the given relay.
    pub fn new(relay: R) -> Self {
        Self { relay }
    }

    /// Push `message` to every target, concurrently.
    ///
    /// Returns [`DispatchError::NoTargets`] before any network activity if
    /// the target list is empty. Otherwise always returns a report covering
    /// exactly one attempt per target.
    pub async fn dispatch(
        &self,
        message: &str,
        targets: &[Target],
        sender_name: &str,
    ) -> Result<BatchReport, DispatchError> {
        if targets.is_empty() {
            return Err(DispatchError::NoTargets);
        }

        let attempts = targets.iter().map(|target| {
            let request = PushRequest::new(&target.endpoint_key, sender_name, message);
            async move {
                match self.relay.push(&request).await {
                    Ok(()) => Ok(()),
                    Err(e) => Err(DeliveryFailure {
                        target_id: target.id,
                        display_name: target.display_name.clone(),
                        reason: e.to_string(),
                    }),
                }
            }
        });

        let mut report = BatchReport::default();
        for outcome in join_all(attempts).await {
            match outcome {
                Ok(()) => report.succeeded += 1,
                Err(failure) => {
                    tracing::debug!(
                        target = %failure.display_name,
                        reason = %failure.reason,
                        "push delivery failed"
                    );
                    report.failed.push(failure);
                }
            }
        }

        tracing::debug!(
            succeeded = report.succeeded,
            failed = report.failed.len(),
            "dispatch batch settled"
        );
        Ok(report)
    }

    /// Access the underlying relay (for testing).
    pub fn relay(&self) -> &R {
        &self.relay
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::MockRelay;

    fn targets(keys: &[&str]) -> Vec<Target> {
        keys.iter()
            .map(|k| Target::new(&format!("user-{}", k), k))
            .collect()
    }

    #[tokio::test]
    async fn one_attempt_per_target() {
        let relay = MockRelay::new();
        let dispatcher = BuzzDispatcher::new(relay.clone());
        let batch = targets(&["a", "b", "c", "d"]);

        let report = dispatcher.dispatch("ping", &batch, "Ann").await.unwrap();

        assert_eq!(relay.push_count(), 4);
        assert_eq!(report.attempted(), 4);
        assert_eq!(report.succeeded, 4);
    }

    #[tokio::test]
    async fn attempts_made_even_when_all_fail() {
        let relay = MockRelay::new();
        for key in ["a", "b", "c"] {
            relay.fail_endpoint(key, "down");
        }
        let dispatcher = BuzzDispatcher::new(relay.clone());
        let batch = targets(&["a", "b", "c"]);

        let report = dispatcher.dispatch("ping", &batch, "Ann").await.unwrap();

        assert_eq!(relay.push_count(), 3);
        assert_eq!(report.succeeded, 0);
        assert_eq!(report.failed.len(), 3);
    }

    #[tokio::test]
    async fn failure_is_isolated_per_target() {
        let relay = MockRelay::new();
        relay.fail_endpoint("bad", "unreachable");
        let dispatcher = BuzzDispatcher::new(relay.clone());
        let batch = targets(&["bad", "good"]);

        let report = dispatcher.dispatch("ping", &batch, "Ann").await.unwrap();

        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].display_name, "user-bad");
        assert_eq!(report.failed[0].target_id, batch[0].id);
    }

    #[tokio::test]
    async fn empty_target_list_is_an_error_before_any_push() {
        let relay = MockRelay::new();
        let dispatcher = BuzzDispatcher::new(relay.clone());

        let result = dispatcher.dispatch("ping", &[], "Ann").await;

        assert!(matches!(result, Err(DispatchError::NoTargets)));
        assert_eq!(relay.push_count(), 0);
    }

    #[tokio::test]
    async fn pushes_carry_sender_and_message() {
        let relay = MockRelay::new();
        let dispatcher = BuzzDispatcher::new(relay.clone());
        let batch = targets(&["k"]);

        dispatcher.dispatch("coffee?", &batch, "Ann").await.unwrap();

        let pushes = relay.pushes();
        assert_eq!(pushes[0].title, "Ann");
        assert_eq!(pushes[0].body, "coffee?");
        assert_eq!(pushes[0].endpoint_key, "k");
    }

    #[test]
    fn summary_lists_failed_names() {
        let report = BatchReport {
            succeeded: 2,
            failed: vec![
                DeliveryFailure {
                    target_id: ActorId::new(),
                    display_name: "Bob".into(),
                    reason: "down".into(),
                },
                DeliveryFailure {
                    target_id: ActorId::new(),
                    display_name: "Cy".into(),
                    reason: "down".into(),
                },
            ],
        };
        assert_eq!(report.summary(), "2 succeeded, 2 failed: Bob, Cy");
        assert!(!report.all_delivered());
    }

    #[test]
    fn summary_when_all_delivered() {
        let report = BatchReport {
            succeeded: 3,
            failed: vec![],
        };
        assert_eq!(report.summary(), "3 succeeded");
        assert!(report.all_delivered());
    }
}
