//! HTTP transport for the Webdock API
//!
//! One `reqwest::Client` is built per [`WebdockClient`] and cloned into every
//! concurrent operation; clones share the connection pool.

use crate::action::ActionHandle;
use crate::error::{ApiError, ErrorBody, Result};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Response header carrying the tracking token of an asynchronous action
pub const CALLBACK_HEADER: &str = "X-Callback-ID";

pub const DEFAULT_API_ENDPOINT: &str = "https://api.webdock.io";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Connection settings for [`WebdockClient`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_endpoint: String,
    pub token: String,
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn new(api_endpoint: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            api_endpoint: api_endpoint.into(),
            token: token.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Webdock API client
#[derive(Debug, Clone)]
pub struct WebdockClient {
    http: reqwest::Client,
    base_url: String,
}

impl WebdockClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        if config.token.trim().is_empty() {
            return Err(ApiError::InvalidConfig("API token is empty".to_string()));
        }

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.token))
            .map_err(|e| ApiError::InvalidConfig(format!("invalid API token: {}", e)))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .map_err(|source| ApiError::Network {
                operation: "build client",
                source,
            })?;

        let base_url = format!("{}/v1", config.api_endpoint.trim_end_matches('/'));

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        debug!("{} {}", method, url);
        self.http.request(method, url)
    }

    /// Send a request, turning non-2xx responses into [`ApiError`]
    pub(crate) async fn send(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<Response> {
        let response = request
            .send()
            .await
            .map_err(|source| ApiError::Network { operation, source })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        debug!("{} returned {}: {}", operation, status, text);

        match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => Err(ApiError::Status {
                operation,
                status,
                body,
            }),
            Err(source) => Err(ApiError::UndecodableStatus {
                operation,
                status,
                text,
                source,
            }),
        }
    }

    /// Decode a successful response body
    pub(crate) async fn decode<T: DeserializeOwned>(
        operation: &'static str,
        response: Response,
    ) -> Result<T> {
        let text = response
            .text()
            .await
            .map_err(|source| ApiError::Network { operation, source })?;

        serde_json::from_str(&text).map_err(|source| ApiError::Decode { operation, source })
    }

    /// Tracking token of the action started by this response
    pub(crate) fn handle(response: &Response) -> ActionHandle {
        response
            .headers()
            .get(CALLBACK_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(ActionHandle::from)
            .unwrap_or_default()
    }
}

/// Percent-encode a path segment
pub(crate) fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}
