//! Push-delivery targets.

use crate::ids::ActorId;
use serde::{Deserialize, Serialize};

/// A delivery target for direct buzz dispatch.
///
/// Owned by the target directory; dispatch calls borrow targets and never
/// mutate them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Unique identifier of the target.
    pub id: ActorId,
    /// Human-readable name shown in dispatch summaries.
    pub display_name: String,
    /// Opaque device key on the push relay.
    pub endpoint_key: String,
}

impl Target {
    /// Create a new target.
    pub fn new(display_name: &str, endpoint_key: &str) -> Self {
        Self {
            id: ActorId::new(),
            display_name: display_name.trim().to_string(),
            endpoint_key: endpoint_key.trim().to_string(),
        }
    }

    /// Create a target from either a bare endpoint key or a pasted relay URL.
    ///
    /// Users often paste the full per-device URL from the relay app
    /// (`https://host/KEY/...`); this extracts the key segment.
    pub fn from_key_or_url(display_name: &str, key_or_url: &str, relay_host: &str) -> Self {
        let key = extract_endpoint_key(key_or_url, relay_host);
        Self::new(display_name, &key)
    }
}

/// Extract the endpoint key from a pasted relay URL, or return the input
/// unchanged if it does not reference the relay host.
fn extract_endpoint_key(input: &str, relay_host: &str) -> String {
    let trimmed = input.trim();
    let host = relay_host
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/');
    if host.is_empty() {
        return trimmed.to_string();
    }
    match trimmed.split_once(&format!("{}/", host)) {
        Some((_, rest)) => rest
            .split('/')
            .next()
            .unwrap_or(rest)
            .split('?')
            .next()
            .unwrap_or(rest)
            .to_string(),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_key_passes_through() {
        let t = Target::from_key_or_url("Ann", "abc123KEY", "https://push.example.com");
        assert_eq!(t.endpoint_key, "abc123KEY");
    }

    #[test]
    fn full_url_is_stripped_to_key() {
        let t = Target::from_key_or_url(
            "Ann",
            "https://push.example.com/abc123KEY/some/message",
            "https://push.example.com",
        );
        assert_eq!(t.endpoint_key, "abc123KEY");
    }

    #[test]
    fn url_with_query_is_stripped() {
        let t = Target::from_key_or_url(
            "Ann",
            "https://push.example.com/abc123KEY?icon=x",
            "https://push.example.com",
        );
        assert_eq!(t.endpoint_key, "abc123KEY");
    }

    #[test]
    fn other_host_url_is_left_alone() {
        let t = Target::from_key_or_url(
            "Ann",
            "https://elsewhere.example.com/abc",
            "https://push.example.com",
        );
        assert_eq!(t.endpoint_key, "https://elsewhere.example.com/abc");
    }

    #[test]
    fn names_and_keys_are_trimmed() {
        let t = Target::new("  Ann  ", "  key  ");
        assert_eq!(t.display_name, "Ann");
        assert_eq!(t.endpoint_key, "key");
    }
}
