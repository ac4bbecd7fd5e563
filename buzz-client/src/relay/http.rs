//! HTTP relay implementation.
//!
//! Delivers pushes with the relay's GET contract:
//! `{host}/{key}/{urlencode(title)}/{urlencode(body)}?icon={icon}&group={tag}`.

use super::{PushRelay, PushRequest, RelayError};
use crate::config::DispatchConfig;
use async_trait::async_trait;

/// Push relay speaking the fire-and-forget HTTP GET contract.
#[derive(Debug, Clone)]
pub struct HttpRelay {
    client: reqwest::Client,
    config: DispatchConfig,
}

impl HttpRelay {
    /// Create a relay client with the configured bounded timeout.
    pub fn new(config: DispatchConfig) -> Result<Self, RelayError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RelayError::Transport(e.to_string()))?;
        Ok(Self { client, config })
    }

    /// Build the per-target push URL.
    fn push_url(&self, request: &PushRequest) -> String {
        format!(
            "{}/{}/{}/{}",
            self.config.relay_host.trim_end_matches('/'),
            request.endpoint_key,
            urlencoding::encode(&request.title),
            urlencoding::encode(&request.body),
        )
    }
}

#[async_trait]
impl PushRelay for HttpRelay {
    async fn push(&self, request: &PushRequest) -> Result<(), RelayError> {
        let url = self.push_url(request);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("icon", self.config.icon_url.as_str()),
                ("group", self.config.group_tag.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RelayError::Timeout
                } else if e.is_builder() {
                    RelayError::InvalidUrl(e.to_string())
                } else {
                    RelayError::Transport(e.to_string())
                }
            })?;

        // Fire-and-forget: the body is ignored, and a non-2xx status still
        // means the transport worked.
        if !response.status().is_success() {
            tracing::debug!(status = %response.status(), key = %request.endpoint_key, "relay returned non-success status");
        }
        Ok(())
    }
}
