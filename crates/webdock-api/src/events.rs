//! Event log
//!
//! Every asynchronous action the platform accepts is recorded as an event.
//! The event log is read-only from the client's side; every poll re-fetches.

use crate::client::WebdockClient;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime};
use reqwest::Method;
use serde::{Deserialize, Serialize};

/// Platform format of `startTime` / `endTime`
const EVENT_TIME_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// Status of an event
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventStatus {
    Waiting,
    Working,
    Finished,
    Error,
    /// Vocabulary this client does not know
    Other(String),
}

/// How a poller should react to a status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// Keep polling
    Pending,
    /// The action completed successfully
    Target,
    /// The action will not complete successfully
    Failed,
}

impl EventStatus {
    pub fn as_str(&self) -> &str {
        match self {
            EventStatus::Waiting => "waiting",
            EventStatus::Working => "working",
            EventStatus::Finished => "finished",
            EventStatus::Error => "error",
            EventStatus::Other(s) => s,
        }
    }

    pub fn class(&self) -> StatusClass {
        match self {
            EventStatus::Waiting | EventStatus::Working => StatusClass::Pending,
            EventStatus::Finished => StatusClass::Target,
            EventStatus::Error | EventStatus::Other(_) => StatusClass::Failed,
        }
    }
}

impl Default for EventStatus {
    fn default() -> Self {
        EventStatus::Other(String::new())
    }
}

impl From<String> for EventStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "waiting" => EventStatus::Waiting,
            "working" => EventStatus::Working,
            "finished" => EventStatus::Finished,
            "error" => EventStatus::Error,
            _ => EventStatus::Other(s),
        }
    }
}

impl From<EventStatus> for String {
    fn from(status: EventStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One asynchronous action recorded by the platform
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub status: EventStatus,
    #[serde(default)]
    pub callback_id: Option<String>,
    #[serde(default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub action_data: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub server_slug: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
}

impl Event {
    pub fn matches(&self, callback_id: &str) -> bool {
        self.callback_id.as_deref() == Some(callback_id)
    }

    /// Parsed `startTime`, if present and readable
    pub fn started_at(&self) -> Option<NaiveDateTime> {
        self.start_time.as_deref().and_then(parse_event_time)
    }
}

fn parse_event_time(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, EVENT_TIME_FORMAT)
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|t| t.naive_utc())
        })
}

/// Filter for [`EventLog::list_events`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EventQuery {
    #[serde(rename = "callbackId", skip_serializing_if = "Option::is_none")]
    pub callback_id: Option<String>,
    #[serde(rename = "eventType", skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(rename = "per_page", skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
}

impl EventQuery {
    pub fn for_callback(callback_id: impl Into<String>) -> Self {
        Self {
            callback_id: Some(callback_id.into()),
            ..Default::default()
        }
    }

    pub fn with_event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    pub fn with_page(mut self, page: u32, per_page: u32) -> Self {
        self.page = Some(page);
        self.per_page = Some(per_page);
        self
    }
}

/// Read access to the event log
#[async_trait]
pub trait EventLog: Send + Sync {
    async fn list_events(&self, query: &EventQuery) -> Result<Vec<Event>>;
}

#[async_trait]
impl EventLog for WebdockClient {
    async fn list_events(&self, query: &EventQuery) -> Result<Vec<Event>> {
        let request = self.request(Method::GET, "events").query(query);
        let response = self.send("get events", request).await?;
        Self::decode("get events", response).await
    }
}
