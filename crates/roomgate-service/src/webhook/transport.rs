//! Signed HTTP transport for backend webhook calls.
//!
//! Every outgoing request body is serialized once to canonical JSON bytes,
//! signed with HMAC-SHA256 over those exact bytes, and POSTed with a
//! bounded timeout. When a legacy shared secret is configured it is
//! attached as an additional plain header so older backend versions can
//! authenticate without verifying signatures; both schemes are sent on the
//! same request.
//!
//! All failures are reported as [`WebhookError`] values. Callers decide
//! policy; nothing here retries or panics.

use crate::config::Config;
use common::secret::{ExposeSecret, SecretString};
use reqwest::header::CONTENT_TYPE;
use ring::hmac;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Header carrying the HMAC-SHA256 signature of the request body.
pub const SIGNATURE_HEADER: &str = "X-Roomgate-Signature";

/// Legacy shared-secret header for older backend versions.
pub const LEGACY_AUTH_HEADER: &str = "X-Auth-Token";

/// Connect timeout, separate from the overall per-call timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Failures of a single backend call.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Payload could not be serialized (caller-side bug).
    #[error("payload serialization failed: {0}")]
    Serialize(String),

    /// Connection-level failure (refused, reset, DNS).
    #[error("transport error: {0}")]
    Transport(String),

    /// The bounded per-call timeout elapsed.
    #[error("backend request timed out")]
    Timeout,

    /// The backend answered with a non-2xx status.
    #[error("backend returned status {0}")]
    Protocol(u16),

    /// The backend answered 2xx but the body did not parse.
    #[error("malformed backend response: {0}")]
    MalformedResponse(String),
}

impl WebhookError {
    /// Whether this failure was the per-call timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, WebhookError::Timeout)
    }
}

/// HTTP client for the policy backend.
///
/// Cheap to clone; the underlying connection pool is shared.
#[derive(Clone)]
pub struct WebhookClient {
    client: reqwest::Client,
    base_url: String,
    secret: SecretString,
    legacy_secret: Option<SecretString>,
}

impl WebhookClient {
    /// Build a client from the service configuration.
    ///
    /// # Errors
    ///
    /// Returns `WebhookError::Transport` if the HTTP client cannot be built.
    pub fn new(config: &Config) -> Result<Self, WebhookError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| WebhookError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.backend_base_url.clone(),
            secret: config.webhook_secret.clone(),
            legacy_secret: config.legacy_shared_secret.clone(),
        })
    }

    /// POST a signed payload and return the raw response body.
    ///
    /// # Errors
    ///
    /// Any transport failure, timeout, or non-2xx status is returned as a
    /// typed [`WebhookError`].
    pub async fn send<T: Serialize>(&self, path: &str, payload: &T) -> Result<Vec<u8>, WebhookError> {
        let body = serde_json::to_vec(payload).map_err(|e| WebhookError::Serialize(e.to_string()))?;
        let signature = self.signature_for(&body);

        let url = format!("{}{}", self.base_url, path);
        let mut request = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .header(SIGNATURE_HEADER, signature);

        if let Some(legacy) = &self.legacy_secret {
            request = request.header(LEGACY_AUTH_HEADER, legacy.expose_secret());
        }

        let response = request.body(body).send().await.map_err(|e| {
            if e.is_timeout() {
                WebhookError::Timeout
            } else {
                WebhookError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(WebhookError::Protocol(status.as_u16()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| WebhookError::Transport(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    /// POST a signed payload and parse the JSON response.
    ///
    /// # Errors
    ///
    /// As [`WebhookClient::send`], plus `MalformedResponse` when the 2xx
    /// body does not deserialize into `R`.
    pub async fn send_json<T, R>(&self, path: &str, payload: &T) -> Result<R, WebhookError>
    where
        T: Serialize,
        R: DeserializeOwned,
    {
        let body = self.send(path, payload).await?;
        serde_json::from_slice(&body).map_err(|e| WebhookError::MalformedResponse(e.to_string()))
    }

    /// HMAC-SHA256 signature header value for a request body.
    pub(crate) fn signature_for(&self, body: &[u8]) -> String {
        let key = hmac::Key::new(hmac::HMAC_SHA256, self.secret.expose_secret().as_bytes());
        let tag = hmac::sign(&key, body);
        format!("sha256={}", hex::encode(tag.as_ref()))
    }
}
