//! Mock relay for testing.
//!
//! Records pushed requests and supports forced per-endpoint failures.

use super::{PushRelay, PushRequest, RelayError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Mock push relay.
///
/// Records every push and can be told to fail specific endpoint keys,
/// for exercising per-target failure isolation.
#[derive(Debug, Default)]
pub struct MockRelay {
    inner: Arc<Mutex<MockRelayInner>>,
}

#[derive(Debug, Default)]
struct MockRelayInner {
    pushes: Vec<PushRequest>,
    failing: HashMap<String, String>,
}

impl MockRelay {
    /// Create a new mock relay.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cause every push to the given endpoint key to fail.
    pub fn fail_endpoint(&self, endpoint_key: &str, reason: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .failing
            .insert(endpoint_key.to_string(), reason.to_string());
    }

    /// All requests that were pushed, including failed attempts.
    pub fn pushes(&self) -> Vec<PushRequest> {
        let inner = self.inner.lock().unwrap();
        inner.pushes.clone()
    }

    /// Number of push attempts made.
    pub fn push_count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.pushes.len()
    }

    /// Clear recorded pushes and failure rules.
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        *inner = MockRelayInner::default();
    }
}

impl Clone for MockRelay {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl PushRelay for MockRelay {
    async fn push(&self, request: &PushRequest) -> Result<(), RelayError> {
        let mut inner = self.inner.lock().unwrap();
        inner.pushes.push(request.clone());

        if let Some(reason) = inner.failing.get(&request.endpoint_key) {
            return Err(RelayError::Transport(reason.clone()));
        }
        Ok(())
    }
}
