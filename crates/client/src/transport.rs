//! HTTP transport for the lecture REST API.
//!
//! Every stage call goes through [`Transport`] so that failures share a
//! single shape: a non-2xx response becomes [`ApiError::Remote`] whose
//! message is the body's `error` field, or `HTTP <status>` when the body
//! has none.

use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Errors from the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("{message}")]
    Remote {
        /// HTTP status code.
        status: u16,
        /// The body's `error` field, or `HTTP <status>`.
        message: String,
    },

    /// A 2xx body did not match the expected schema.
    #[error("Malformed response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    /// The endpoint path could not be resolved against the base URL.
    #[error("Invalid URL for '{path}': {reason}")]
    InvalidUrl { path: String, reason: String },
}

/// Decide the outcome of a response from its status and raw body.
///
/// The body is parsed as JSON regardless of status; an empty or
/// malformed body counts as `{}`.
pub fn interpret(status: StatusCode, body: &[u8]) -> Result<Value, ApiError> {
    let value = serde_json::from_slice::<Value>(body)
        .unwrap_or_else(|_| Value::Object(serde_json::Map::new()));

    if status.is_success() {
        Ok(value)
    } else {
        Err(remote_error(status, &value))
    }
}

fn remote_error(status: StatusCode, body: &Value) -> ApiError {
    let message = body
        .get("error")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

    ApiError::Remote {
        status: status.as_u16(),
        message,
    }
}

/// HTTP client bound to one lecture server.
#[derive(Debug, Clone)]
pub struct Transport {
    client: reqwest::Client,
    base_url: Url,
}

impl Transport {
    /// Create a transport with its own connection pool and a per-request
    /// timeout.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Create a transport reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, mut base_url: Url) -> Self {
        // `Url::join` replaces the last segment unless the base ends in '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self { client, base_url }
    }

    /// Resolve an absolute API path (`/api/...`) against the base URL.
    pub fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::InvalidUrl {
                path: path.to_string(),
                reason: e.to_string(),
            })
    }

    /// Start a request to `path`.
    pub fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let url = self.url(path)?;
        tracing::debug!(%method, path, "Lecture API request");
        Ok(self.client.request(method, url))
    }

    /// Send a request and decode its JSON body into `T`.
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        request: RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        let value = interpret(status, &body)?;

        serde_json::from_value(value).map_err(|source| ApiError::Decode {
            endpoint: endpoint.to_string(),
            source,
        })
    }

    /// Send a request whose success body is binary.
    ///
    /// Returns the response unread on success so the caller can stream
    /// it; failures carry the same error contract as [`send_json`].
    ///
    /// [`send_json`]: Self::send_json
    pub async fn send_raw(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.bytes().await.unwrap_or_default();
        let value = serde_json::from_slice::<Value>(&body).unwrap_or(Value::Null);
        Err(remote_error(status, &value))
    }
}
