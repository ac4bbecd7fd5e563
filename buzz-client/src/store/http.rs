//! REST implementation of the group store.
//!
//! Speaks a PostgREST-style table API: rows are JSON, filters are query
//! parameters (`code=eq.1234`), and the API key travels in headers. Change
//! delivery is bounded polling of the notifications table ordered by
//! `created_at`; merged with the feed's idempotent insert this satisfies
//! the "notify on insert filtered by group_id" contract without a
//! persistent socket.

use super::{GroupRecord, GroupStore, StoreError};
use crate::config::{StoreConfig, DEFAULT_TIMEOUT};
use async_trait::async_trait;
use buzz_types::{ActorId, Event, EventId, EventKind, GroupId, JoinCode};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;

/// Interval between change-stream polls.
const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// How far behind the cursor each poll reaches.
///
/// `created_at` is stamped by the originator, so an event can commit after
/// the cursor has already advanced past its timestamp (clock skew, or two
/// publishers whose commit order inverts their stamps). A strict cursor
/// would exclude such an event forever. Polling an overlapping window
/// re-fetches the recent past instead; the feed's id-idempotent merge
/// absorbs the duplicates.
const POLL_OVERLAP_MILLIS: u64 = 60_000;

/// Lower bound of the poll window for a given cursor position.
fn window_start(last_seen: u64) -> u64 {
    last_seen.saturating_sub(POLL_OVERLAP_MILLIS)
}

/// REST-backed [`GroupStore`].
#[derive(Debug, Clone)]
pub struct RestStore {
    client: reqwest::Client,
    base_url: String,
}

/// Wire row for the `groups` table.
#[derive(Debug, Serialize, Deserialize)]
struct GroupRow {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    name: String,
    code: String,
}

/// Wire row for the `notifications` table.
#[derive(Debug, Serialize, Deserialize)]
struct EventRow {
    id: String,
    group_id: String,
    sender_id: String,
    sender_name: String,
    message: String,
    #[serde(rename = "type")]
    kind: String,
    /// Milliseconds since the Unix epoch, assigned by the originator.
    created_at: u64,
}

impl RestStore {
    /// Build a store client from credentials.
    ///
    /// Fails when the URL does not parse or the key cannot be sent as a
    /// header; the caller treats that as BackendUnavailable and falls back
    /// to offline mode.
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let url = reqwest::Url::parse(&config.url)
            .map_err(|e| StoreError::Unavailable(format!("bad store url: {}", e)))?;
        if config.api_key.trim().is_empty() {
            return Err(StoreError::Unavailable("missing api key".into()));
        }

        let mut headers = HeaderMap::new();
        let key_value = HeaderValue::from_str(&config.api_key)
            .map_err(|_| StoreError::Unavailable("api key is not header-safe".into()))?;
        headers.insert("apikey", key_value);
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|_| StoreError::Unavailable("api key is not header-safe".into()))?;
        headers.insert(AUTHORIZATION, bearer);

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .default_headers(headers)
            .build()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            base_url: url.as_str().trim_end_matches('/').to_string(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    async fn fetch_window(
        &self,
        group: GroupId,
        from_millis: u64,
    ) -> Result<Vec<EventRow>, StoreError> {
        let response = self
            .client
            .get(self.table_url("notifications"))
            .query(&[
                ("group_id", format!("eq.{}", group)),
                ("created_at", format!("gte.{}", from_millis)),
                ("order", "created_at.asc".to_string()),
            ])
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;
        check_status(&response)?;
        response
            .json()
            .await
            .map_err(|e| StoreError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl GroupStore for RestStore {
    async fn create_group(&self, name: &str, code: &JoinCode) -> Result<GroupRecord, StoreError> {
        let row = GroupRow {
            id: None,
            name: name.to_string(),
            code: code.as_str().to_string(),
        };
        let response = self
            .client
            .post(self.table_url("groups"))
            .header("Prefer", "return=representation")
            .json(&vec![row])
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;

        if response.status() == reqwest::StatusCode::CONFLICT {
            return Err(StoreError::CodeTaken);
        }
        check_status(&response)?;

        let rows: Vec<GroupRow> = response
            .json()
            .await
            .map_err(|e| StoreError::Malformed(e.to_string()))?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::Malformed("insert returned no row".into()))
            .and_then(group_record)
    }

    async fn find_group(&self, code: &JoinCode) -> Result<Option<GroupRecord>, StoreError> {
        let response = self
            .client
            .get(self.table_url("groups"))
            .query(&[("code", format!("eq.{}", code)), ("select", "*".to_string())])
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;
        check_status(&response)?;

        let rows: Vec<GroupRow> = response
            .json()
            .await
            .map_err(|e| StoreError::Malformed(e.to_string()))?;
        rows.into_iter().next().map(group_record).transpose()
    }

    async fn recent_events(
        &self,
        group: GroupId,
        limit: usize,
    ) -> Result<Vec<Event>, StoreError> {
        let response = self
            .client
            .get(self.table_url("notifications"))
            .query(&[
                ("group_id", format!("eq.{}", group)),
                ("order", "created_at.desc".to_string()),
                ("limit", limit.to_string()),
            ])
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;
        check_status(&response)?;

        let rows: Vec<EventRow> = response
            .json()
            .await
            .map_err(|e| StoreError::Malformed(e.to_string()))?;
        rows.into_iter().map(domain_event).collect()
    }

    async fn insert_event(&self, group: GroupId, event: &Event) -> Result<(), StoreError> {
        let row = event_row(group, event);
        let response = self
            .client
            .post(self.table_url("notifications"))
            .json(&vec![row])
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;
        check_status(&response)
    }

    async fn open_stream(
        &self,
        group: GroupId,
        since_millis: u64,
    ) -> Result<mpsc::Receiver<Event>, StoreError> {
        let (tx, rx) = mpsc::channel(64);
        let store = self.clone();
        // The cursor starts at the caller's seeded history position, not at
        // the local clock, so nothing between the seed and the first poll
        // can fall through. Each poll reaches POLL_OVERLAP_MILLIS behind
        // the cursor; duplicates are the consumer's problem by contract.
        let mut last_seen = since_millis;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(POLL_INTERVAL);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = tx.closed() => break,
                    _ = ticker.tick() => {
                        match store.fetch_window(group, window_start(last_seen)).await {
                            Ok(rows) => {
                                for row in rows {
                                    last_seen = last_seen.max(row.created_at);
                                    match domain_event(row) {
                                        Ok(event) => {
                                            if tx.send(event).await.is_err() {
                                                return;
                                            }
                                        }
                                        Err(e) => {
                                            tracing::warn!(group = %group, error = %e, "skipping malformed event row");
                                        }
                                    }
                                }
                            }
                            Err(e) => {
                                // Transient poll failures keep the stream alive.
                                tracing::warn!(group = %group, error = %e, "change-stream poll failed");
                            }
                        }
                    }
                }
            }
            tracing::debug!(group = %group, "change stream closed");
        });

        Ok(rx)
    }
}

fn check_status(response: &reqwest::Response) -> Result<(), StoreError> {
    if response.status().is_success() {
        Ok(())
    } else {
        Err(StoreError::Request(format!(
            "store returned {}",
            response.status()
        )))
    }
}

fn group_record(row: GroupRow) -> Result<GroupRecord, StoreError> {
    let id = row
        .id
        .as_deref()
        .and_then(GroupId::parse)
        .ok_or_else(|| StoreError::Malformed("group row missing valid id".into()))?;
    let code = JoinCode::parse(&row.code)
        .map_err(|e| StoreError::Malformed(e.to_string()))?;
    Ok(GroupRecord {
        id,
        name: row.name,
        code,
    })
}

fn event_row(group: GroupId, event: &Event) -> EventRow {
    EventRow {
        id: event.id.to_string(),
        group_id: group.to_string(),
        sender_id: event.sender_id.to_string(),
        sender_name: event.sender_name.clone(),
        message: event.text.clone(),
        kind: kind_to_str(event.kind).to_string(),
        created_at: event.timestamp,
    }
}

fn domain_event(row: EventRow) -> Result<Event, StoreError> {
    let id = EventId::parse(&row.id)
        .ok_or_else(|| StoreError::Malformed("event row has invalid id".into()))?;
    let sender_id = ActorId::parse(&row.sender_id)
        .ok_or_else(|| StoreError::Malformed("event row has invalid sender id".into()))?;
    Ok(Event {
        id,
        sender_id,
        sender_name: row.sender_name,
        text: row.message,
        timestamp: row.created_at,
        kind: kind_from_str(&row.kind)?,
    })
}

fn kind_to_str(kind: EventKind) -> &'static str {
    match kind {
        EventKind::Buzz => "buzz",
        EventKind::Message => "message",
        EventKind::System => "system",
    }
}

fn kind_from_str(s: &str) -> Result<EventKind, StoreError> {
    match s {
        "buzz" => Ok(EventKind::Buzz),
        "message" => Ok(EventKind::Message),
        "system" => Ok(EventKind::System),
        other => Err(StoreError::Malformed(format!(
            "unknown event type {:?}",
            other
        ))),
    }
}
