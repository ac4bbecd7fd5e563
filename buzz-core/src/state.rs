//! Channel connection state machine.
//!
//! This module provides a pure, side-effect-free state machine for the
//! lifecycle of one group subscription. The state machine takes events as
//! input and produces a new state plus a list of actions to execute.
//!
//! The actual I/O (opening streams, starting timers) is performed by
//! buzz-client, not by this module. This enables instant unit testing
//! without network mocks.

/// Subscription state for one channel instance - NO I/O, just transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelState {
    /// No active subscription.
    Disconnected,
    /// Backend listener is being established.
    Connecting,
    /// Listener is live; events flow into the feed.
    Subscribed,
    /// Backend failure; listener must be torn down.
    Error {
        /// Description of the backend failure.
        reason: String,
    },
}

impl ChannelState {
    /// Create a new state machine in the Disconnected state.
    pub fn new() -> Self {
        Self::Disconnected
    }

    /// Process an event and return the new state plus actions to execute.
    ///
    /// This is a pure function - no side effects. The caller (buzz-client)
    /// is responsible for executing the returned actions.
    pub fn on_event(self, event: ChannelEvent) -> (Self, Vec<Action>) {
        match (self, event) {
            // From Disconnected
            (Self::Disconnected, ChannelEvent::SubscribeRequested) => {
                (Self::Connecting, vec![Action::OpenListener])
            }

            // From Connecting
            (Self::Connecting, ChannelEvent::ListenerReady) => (
                Self::Subscribed,
                vec![Action::Notify(StatusChange::Subscribed)],
            ),
            (Self::Connecting, ChannelEvent::ListenerFailed { reason }) => (
                Self::Error {
                    reason: reason.clone(),
                },
                vec![
                    Action::CloseListener,
                    Action::Notify(StatusChange::Failed { reason }),
                ],
            ),
            (Self::Connecting, ChannelEvent::UnsubscribeRequested) => {
                (Self::Disconnected, vec![Action::CloseListener])
            }

            // From Subscribed
            (Self::Subscribed, ChannelEvent::ListenerFailed { reason }) => (
                Self::Error {
                    reason: reason.clone(),
                },
                vec![
                    Action::CloseListener,
                    Action::Notify(StatusChange::Failed { reason }),
                ],
            ),
            (Self::Subscribed, ChannelEvent::UnsubscribeRequested) => (
                Self::Disconnected,
                vec![
                    Action::CloseListener,
                    Action::Notify(StatusChange::Unsubscribed),
                ],
            ),

            // From Error - teardown complete, come to rest
            (Self::Error { .. }, ChannelEvent::TeardownComplete) => {
                (Self::Disconnected, vec![])
            }
            (Self::Error { .. }, ChannelEvent::UnsubscribeRequested) => {
                (Self::Disconnected, vec![])
            }

            // Invalid transitions - stay in current state
            (state, _) => (state, vec![]),
        }
    }

    /// Check if the listener is live.
    pub fn is_subscribed(&self) -> bool {
        matches!(self, Self::Subscribed)
    }

    /// Check if a subscription attempt is in flight.
    pub fn is_connecting(&self) -> bool {
        matches!(self, Self::Connecting)
    }
}

impl Default for ChannelState {
    fn default() -> Self {
        Self::new()
    }
}

/// Events that can occur in the subscription lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// Caller requested a subscription.
    SubscribeRequested,
    /// Backend listener (stream or timer) is established.
    ListenerReady,
    /// Backend listener failed.
    ListenerFailed {
        /// Description of the failure.
        reason: String,
    },
    /// Caller invoked the unsubscribe handle.
    UnsubscribeRequested,
    /// Teardown after a failure has completed.
    TeardownComplete,
}

/// Actions to be executed by buzz-client.
///
/// These are instructions, not side effects. The client interprets them
/// and performs the actual I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Open the backend listener (change stream or simulator timer).
    OpenListener,
    /// Tear down the backend listener.
    CloseListener,
    /// Surface a status change to the application.
    Notify(StatusChange),
}

/// Status changes surfaced to the application layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusChange {
    /// Listener is live.
    Subscribed,
    /// Listener was torn down at the caller's request.
    Unsubscribed,
    /// Listener failed.
    Failed {
        /// Description of the failure.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_disconnected() {
        let state = ChannelState::new();
        assert!(matches!(state, ChannelState::Disconnected));
    }

    #[test]
    fn subscribe_request_transitions_to_connecting() {
        let (state, actions) = ChannelState::Disconnected.on_event(ChannelEvent::SubscribeRequested);

        assert!(matches!(state, ChannelState::Connecting));
        assert!(actions.iter().any(|a| matches!(a, Action::OpenListener)));
    }

    #[test]
    fn listener_ready_transitions_to_subscribed() {
        let (state, actions) = ChannelState::Connecting.on_event(ChannelEvent::ListenerReady);

        assert!(state.is_subscribed());
        assert!(actions
            .iter()
            .any(|a| matches!(a, Action::Notify(StatusChange::Subscribed))));
    }

    #[test]
    fn listener_failure_enters_error_state() {
        let (state, actions) = ChannelState::Subscribed.on_event(ChannelEvent::ListenerFailed {
            reason: "stream dropped".into(),
        });

        assert!(matches!(state, ChannelState::Error { .. }));
        assert!(actions.iter().any(|a| matches!(a, Action::CloseListener)));
        assert!(actions
            .iter()
            .any(|a| matches!(a, Action::Notify(StatusChange::Failed { .. }))));
    }

    #[test]
    fn error_teardown_comes_to_rest() {
        let state = ChannelState::Error {
            reason: "stream dropped".into(),
        };
        let (state, actions) = state.on_event(ChannelEvent::TeardownComplete);

        assert!(matches!(state, ChannelState::Disconnected));
        assert!(actions.is_empty());
    }

    #[test]
    fn unsubscribe_from_subscribed_disconnects() {
        let (state, actions) = ChannelState::Subscribed.on_event(ChannelEvent::UnsubscribeRequested);

        assert!(matches!(state, ChannelState::Disconnected));
        assert!(actions.iter().any(|a| matches!(a, Action::CloseListener)));
    }

    #[test]
    fn unsubscribe_while_connecting_cancels() {
        let (state, actions) = ChannelState::Connecting.on_event(ChannelEvent::UnsubscribeRequested);

        assert!(matches!(state, ChannelState::Disconnected));
        assert!(actions.iter().any(|a| matches!(a, Action::CloseListener)));
    }

    #[test]
    fn repeated_unsubscribe_is_idempotent() {
        let (state, _) = ChannelState::Subscribed.on_event(ChannelEvent::UnsubscribeRequested);
        // A second unsubscribe is an invalid transition from Disconnected:
        // state is unchanged and no actions are produced.
        let (state, actions) = state.on_event(ChannelEvent::UnsubscribeRequested);

        assert!(matches!(state, ChannelState::Disconnected));
        assert!(actions.is_empty());
    }

    #[test]
    fn subscribe_while_subscribed_is_ignored() {
        let (state, actions) = ChannelState::Subscribed.on_event(ChannelEvent::SubscribeRequested);

        assert!(state.is_subscribed());
        assert!(actions.is_empty());
    }

    #[test]
    fn full_lifecycle() {
        let state = ChannelState::new();

        let (state, _) = state.on_event(ChannelEvent::SubscribeRequested);
        assert!(state.is_connecting());

        let (state, _) = state.on_event(ChannelEvent::ListenerReady);
        assert!(state.is_subscribed());

        let (state, _) = state.on_event(ChannelEvent::UnsubscribeRequested);
        assert!(matches!(state, ChannelState::Disconnected));
    }

    #[test]
    fn is_subscribed_helper() {
        assert!(!ChannelState::Disconnected.is_subscribed());
        assert!(!ChannelState::Connecting.is_subscribed());
        assert!(ChannelState::Subscribed.is_subscribed());
        assert!(!ChannelState::Error {
            reason: "x".into()
        }
        .is_subscribed());
    }
}
