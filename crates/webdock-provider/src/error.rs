//! Provider error types

use std::time::Duration;
use thiserror::Error;
use webdock_api::{ActionHandle, ApiError, EventStatus};
use webdock_config::ConfigError;

/// Why waiting for an action did not succeed
#[derive(Error, Debug)]
pub enum WaitError {
    #[error("no tracking token was returned for this action")]
    MissingHandle,

    #[error("event log has no event for tracking token {handle}")]
    EmptyEventLog { handle: ActionHandle },

    #[error("{count} events for tracking token {handle} share the latest start time")]
    AmbiguousEvent { handle: ActionHandle, count: usize },

    #[error("event log query for tracking token {handle} failed: {source}")]
    Transport {
        handle: ActionHandle,
        #[source]
        source: ApiError,
    },

    #[error("action {handle} (event {event_id}) ended with status '{status}': {message}")]
    ActionFailed {
        handle: ActionHandle,
        event_id: i64,
        status: EventStatus,
        message: String,
    },

    #[error(
        "timed out waiting for action {handle} after {elapsed:?} (timeout {timeout:?}, last status: {last_status})"
    )]
    Timeout {
        handle: ActionHandle,
        elapsed: Duration,
        timeout: Duration,
        last_status: String,
    },

    #[error(
        "action {handle} finished but {address} was not reachable after {elapsed:?} (timeout {timeout:?})"
    )]
    Unreachable {
        handle: ActionHandle,
        address: String,
        elapsed: Duration,
        timeout: Duration,
    },

    #[error("wait for action {handle} was cancelled")]
    Cancelled { handle: ActionHandle },
}

impl WaitError {
    /// The deadline passed without a terminal outcome
    pub fn is_timeout(&self) -> bool {
        matches!(self, WaitError::Timeout { .. } | WaitError::Unreachable { .. })
    }

    pub fn handle(&self) -> Option<&ActionHandle> {
        match self {
            WaitError::MissingHandle => None,
            WaitError::EmptyEventLog { handle }
            | WaitError::AmbiguousEvent { handle, .. }
            | WaitError::Transport { handle, .. }
            | WaitError::ActionFailed { handle, .. }
            | WaitError::Timeout { handle, .. }
            | WaitError::Unreachable { handle, .. }
            | WaitError::Cancelled { handle } => Some(handle),
        }
    }
}

/// Resource orchestration errors
///
/// Every variant names the resource so operators can find it in the
/// platform's own event log.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("{operation} {resource_type} '{id}': {source}")]
    Api {
        operation: &'static str,
        resource_type: &'static str,
        id: String,
        #[source]
        source: ApiError,
    },

    #[error("{operation} {resource_type} '{id}': {source}")]
    Wait {
        operation: &'static str,
        resource_type: &'static str,
        id: String,
        #[source]
        source: WaitError,
    },

    #[error("{resource_type} '{id}' not found")]
    NotFound {
        resource_type: &'static str,
        id: String,
    },

    #[error("{resource_type} '{id}' has no IPv4 address to check reachability on")]
    MissingAddress {
        resource_type: &'static str,
        id: String,
    },

    #[error("invalid {resource_type} id '{id}'")]
    InvalidId {
        resource_type: &'static str,
        id: String,
    },

    #[error("invalid {resource_type}: {message}")]
    InvalidSpec {
        resource_type: &'static str,
        message: String,
    },

    #[error("{resource_type} '{id}' cannot be updated in place; changed: {}", .fields.join(", "))]
    ReplaceRequired {
        resource_type: &'static str,
        id: String,
        fields: Vec<&'static str>,
    },

    #[error("{operation} {resource_type} '{id}' was cancelled")]
    Cancelled {
        operation: &'static str,
        resource_type: &'static str,
        id: String,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Client error: {0}")]
    Client(#[from] ApiError),
}

impl ProviderError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ProviderError::Wait { source, .. } if source.is_timeout())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            ProviderError::Cancelled { .. }
                | ProviderError::Wait {
                    source: WaitError::Cancelled { .. },
                    ..
                }
        )
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;
