//! Webdock API error types

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error body returned by the platform on non-2xx responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub id: i64,
    pub message: String,
}

impl std::fmt::Display for ErrorBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Webdock API errors
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{operation} failed ({status}): {body}")]
    Status {
        operation: &'static str,
        status: StatusCode,
        body: ErrorBody,
    },

    #[error("{operation} failed ({status}) with an unreadable error body: {text}")]
    UndecodableStatus {
        operation: &'static str,
        status: StatusCode,
        text: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{operation} request failed: {source}")]
    Network {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to decode {operation} response: {source}")]
    Decode {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ApiError {
    /// HTTP status of the failed request, if the platform answered at all
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } | ApiError::UndecodableStatus { status, .. } => {
                Some(*status)
            }
            ApiError::Network { source, .. } => source.status(),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    /// The decoded `message` of a platform error body
    pub fn platform_message(&self) -> Option<&str> {
        match self {
            ApiError::Status { body, .. } => Some(body.message.as_str()),
            _ => None,
        }
    }

    /// True for malformed JSON in a successful response
    pub fn is_decode(&self) -> bool {
        matches!(self, ApiError::Decode { .. })
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
