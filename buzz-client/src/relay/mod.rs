//! Push relay abstraction.
//!
//! This module provides a pluggable relay layer that abstracts the
//! third-party HTTP push service (real HTTP, mock for testing).
//!
//! # Design
//!
//! The relay trait is async and fire-and-forget:
//! - `push()` delivers one notification to one endpoint key
//! - the response body is never required; only transport-level failure
//!   counts as an error
//!
//! # Example
//!
//! ```ignore
//! let relay = MockRelay::new();
//! relay.push(&PushRequest::new("key", "Ann", "coffee?")).await?;
//! ```

mod http;
mod mock;

pub use http::HttpRelay;
pub use mock::MockRelay;

use async_trait::async_trait;
use thiserror::Error;

/// Relay errors. All are per-target and non-fatal.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Transport-level failure (connect, DNS, TLS, reset).
    #[error("transport error: {0}")]
    Transport(String),

    /// The bounded per-request timeout elapsed.
    #[error("request timed out")]
    Timeout,

    /// The relay host or endpoint key produced an unusable URL.
    #[error("invalid relay url: {0}")]
    InvalidUrl(String),
}

/// One notification to be delivered to one endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushRequest {
    /// Opaque device key on the relay.
    pub endpoint_key: String,
    /// Notification title (the sender's name).
    pub title: String,
    /// Notification body (the message text).
    pub body: String,
}

impl PushRequest {
    /// Create a push request.
    pub fn new(endpoint_key: &str, title: &str, body: &str) -> Self {
        Self {
            endpoint_key: endpoint_key.to_string(),
            title: title.to_string(),
            body: body.to_string(),
        }
    }
}

/// Trait for delivering one push notification.
///
/// Implementations handle the underlying mechanism (HTTP GET against the
/// relay, mock for tests). Success means the transport settled without
/// error; the relay's response is not inspected.
#[async_trait]
pub trait PushRelay: Send + Sync {
    /// Deliver one notification. Bounded by the implementation's timeout.
    async fn push(&self, request: &PushRequest) -> Result<(), RelayError>;
}
