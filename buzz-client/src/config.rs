//! Configuration for buzz-client.

use buzz_core::SimulatorConfig;
use buzz_types::ActorId;
use std::time::Duration;

/// Default push relay host.
pub const DEFAULT_RELAY_HOST: &str = "https://api.day.app";

/// Icon attached to every push notification.
pub const DEFAULT_ICON_URL: &str =
    "https://api.iconify.design/lucide:zap.svg?color=%23ef4444";

/// Grouping tag shown by the relay's notification center.
pub const DEFAULT_GROUP_TAG: &str = "buzzline";

/// Per-request timeout for relay and store calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// The local actor's identity, read from settings at construction time.
#[derive(Debug, Clone)]
pub struct ActorProfile {
    /// Stable identifier of this actor.
    pub id: ActorId,
    /// Display name attached to outgoing events and pushes.
    pub name: String,
}

impl ActorProfile {
    /// Create a profile with a fresh random id.
    pub fn new(name: &str) -> Self {
        Self {
            id: ActorId::new(),
            name: name.to_string(),
        }
    }

    /// Create a profile with a known id (e.g. loaded from disk).
    pub fn with_id(id: ActorId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
        }
    }
}

/// Remote store credentials. Absence means Offline mode.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Base URL of the store's REST endpoint.
    pub url: String,
    /// API key sent with every request.
    pub api_key: String,
}

/// Configuration for dispatching pushes through the relay.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Relay base host.
    pub relay_host: String,
    /// Icon URL attached to every push.
    pub icon_url: String,
    /// Grouping tag for the relay's notification center.
    pub group_tag: String,
    /// Bound on each per-target request.
    pub timeout: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            relay_host: DEFAULT_RELAY_HOST.to_string(),
            icon_url: DEFAULT_ICON_URL.to_string(),
            group_tag: DEFAULT_GROUP_TAG.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl DispatchConfig {
    /// Create a config for the given relay host, defaults elsewhere.
    pub fn new(relay_host: &str) -> Self {
        Self {
            relay_host: relay_host.to_string(),
            ..Self::default()
        }
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the grouping tag.
    pub fn with_group_tag(mut self, tag: &str) -> Self {
        self.group_tag = tag.to_string();
        self
    }
}

/// Configuration for a [`crate::GroupChannel`].
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// The local actor.
    pub actor: ActorProfile,
    /// Remote store credentials; `None` selects Offline mode.
    pub store: Option<StoreConfig>,
    /// Offline simulator tuning.
    pub simulator: SimulatorConfig,
}

impl ChannelConfig {
    /// Create an offline-mode configuration.
    pub fn new(actor: ActorProfile) -> Self {
        Self {
            actor,
            store: None,
            simulator: SimulatorConfig::default(),
        }
    }

    /// Attach remote store credentials, selecting Realtime mode.
    pub fn with_store(mut self, url: &str, api_key: &str) -> Self {
        self.store = Some(StoreConfig {
            url: url.to_string(),
            api_key: api_key.to_string(),
        });
        self
    }

    /// Override the simulator tuning.
    pub fn with_simulator(mut self, simulator: SimulatorConfig) -> Self {
        self.simulator = simulator;
        self
    }
}
