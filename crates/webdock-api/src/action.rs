//! Tracking tokens for asynchronous platform actions

use serde::{Deserialize, Serialize};

/// Tracking token returned by an action-triggering call
///
/// The platform sends it in the `X-Callback-ID` header. It correlates the
/// action with its record in the event log. An empty handle means the
/// header was missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionHandle(String);

impl ActionHandle {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Display for ActionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ActionHandle {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

impl From<String> for ActionHandle {
    fn from(token: String) -> Self {
        Self(token)
    }
}

/// An accepted entity together with the handle of the action it started
#[derive(Debug, Clone, PartialEq)]
pub struct Tracked<T> {
    pub value: T,
    pub handle: ActionHandle,
}

impl<T> Tracked<T> {
    pub fn new(value: T, handle: ActionHandle) -> Self {
        Self { value, handle }
    }
}
