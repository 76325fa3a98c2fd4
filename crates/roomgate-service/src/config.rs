//! Roomgate configuration.
//!
//! Configuration is loaded from environment variables. The webhook shared
//! secret is held as a [`SecretString`] and redacted in Debug output.

use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default per-call backend timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 5;

/// Default HTTP bind address for the hook API.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8090";

/// Default spool directory for recording upload descriptors.
pub const DEFAULT_RECORDING_SPOOL_DIR: &str = "/var/spool/roomgate";

/// Policy for handling backend-unreachable conditions during access
/// validation.
///
/// Exactly one policy is active per deployment; it is applied in a single
/// place (`AccessValidator::decide_on_failure`) so code paths cannot
/// silently diverge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPolicy {
    /// Admit the participant when the backend cannot be consulted.
    /// Prioritizes availability over correctness.
    FailOpen,
    /// Deny the participant when the backend cannot be consulted.
    /// The production default.
    FailClosed,
}

impl FromStr for FailPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fail_open" => Ok(FailPolicy::FailOpen),
            "fail_closed" => Ok(FailPolicy::FailClosed),
            other => Err(ConfigError::InvalidFailPolicy(format!(
                "ROOMGATE_FAIL_POLICY must be 'fail_open' or 'fail_closed', got '{other}'"
            ))),
        }
    }
}

/// Upload destination for completed recordings.
///
/// Present only when `ROOMGATE_RECORDING_FILE_SERVICE_URL` is set. Without
/// it, recording-start events are still reported to the backend but no
/// upload descriptor can be provisioned.
#[derive(Clone)]
pub struct RecordingConfig {
    /// Directory where upload descriptors are written for the external
    /// finalize step.
    pub spool_dir: PathBuf,

    /// Base URL of the file upload service.
    pub file_service_url: String,

    /// Upload endpoint path on the file service.
    pub upload_path: String,

    /// Object-storage bucket name.
    pub bucket: String,

    /// Storage path template; must contain the `{sessionId}` placeholder.
    pub storage_path_template: String,

    /// Webhook the finalize step calls when the upload completes.
    pub webhook_url: String,

    /// Shared secret for the finalize step's webhook call.
    pub webhook_secret: SecretString,
}

impl fmt::Debug for RecordingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingConfig")
            .field("spool_dir", &self.spool_dir)
            .field("file_service_url", &self.file_service_url)
            .field("upload_path", &self.upload_path)
            .field("bucket", &self.bucket)
            .field("storage_path_template", &self.storage_path_template)
            .field("webhook_url", &self.webhook_url)
            .field("webhook_secret", &"[REDACTED]")
            .finish()
    }
}

/// Roomgate configuration.
///
/// Loaded from environment variables with sensible defaults. Secrets are
/// redacted in Debug output.
#[derive(Clone)]
pub struct Config {
    /// Base URL of the policy backend (e.g. "https://backend.example.com/api").
    pub backend_base_url: String,

    /// Shared secret used to HMAC-sign outgoing webhook bodies.
    pub webhook_secret: SecretString,

    /// Legacy shared secret attached as a plain header for older backend
    /// versions. Optional; when absent only the HMAC signature is sent.
    pub legacy_shared_secret: Option<SecretString>,

    /// Per-call backend timeout.
    pub request_timeout: Duration,

    /// Fail policy for access validation when the backend is unreachable.
    pub fail_policy: FailPolicy,

    /// Hook API bind address (default: "0.0.0.0:8090").
    pub bind_address: String,

    /// Recording upload destination, if recording handoff is enabled.
    pub recording: Option<RecordingConfig>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("backend_base_url", &self.backend_base_url)
            .field("webhook_secret", &"[REDACTED]")
            .field(
                "legacy_shared_secret",
                &self.legacy_shared_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("request_timeout", &self.request_timeout)
            .field("fail_policy", &self.fail_policy)
            .field("bind_address", &self.bind_address)
            .field("recording", &self.recording)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid timeout configuration: {0}")]
    InvalidTimeout(String),

    #[error("Invalid fail policy configuration: {0}")]
    InvalidFailPolicy(String),

    #[error("Invalid recording configuration: {0}")]
    InvalidRecording(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let backend_base_url = vars
            .get("ROOMGATE_BACKEND_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .ok_or_else(|| ConfigError::MissingEnvVar("ROOMGATE_BACKEND_URL".to_string()))?;

        let webhook_secret = vars
            .get("ROOMGATE_WEBHOOK_SECRET")
            .map(|s| SecretString::from(s.as_str()))
            .ok_or_else(|| ConfigError::MissingEnvVar("ROOMGATE_WEBHOOK_SECRET".to_string()))?;

        let legacy_shared_secret = vars
            .get("ROOMGATE_LEGACY_SHARED_SECRET")
            .map(|s| SecretString::from(s.as_str()));

        // Parse the backend timeout with validation
        let request_timeout = if let Some(value_str) = vars.get("ROOMGATE_REQUEST_TIMEOUT_SECONDS")
        {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidTimeout(format!(
                    "ROOMGATE_REQUEST_TIMEOUT_SECONDS must be a valid positive integer, got '{value_str}': {e}"
                ))
            })?;

            if value == 0 {
                return Err(ConfigError::InvalidTimeout(
                    "ROOMGATE_REQUEST_TIMEOUT_SECONDS must be greater than 0".to_string(),
                ));
            }

            Duration::from_secs(value)
        } else {
            Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECONDS)
        };

        let fail_policy = match vars.get("ROOMGATE_FAIL_POLICY") {
            Some(value) => value.parse()?,
            None => FailPolicy::FailClosed,
        };

        let bind_address = vars
            .get("ROOMGATE_BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let recording = Self::recording_from_vars(vars, &backend_base_url, &webhook_secret)?;

        Ok(Config {
            backend_base_url,
            webhook_secret,
            legacy_shared_secret,
            request_timeout,
            fail_policy,
            bind_address,
            recording,
        })
    }

    /// Parse the optional recording upload block.
    ///
    /// The file-service URL enables the block; the remaining fields default
    /// where a sensible default exists.
    fn recording_from_vars(
        vars: &HashMap<String, String>,
        backend_base_url: &str,
        webhook_secret: &SecretString,
    ) -> Result<Option<RecordingConfig>, ConfigError> {
        let Some(file_service_url) = vars.get("ROOMGATE_RECORDING_FILE_SERVICE_URL") else {
            return Ok(None);
        };

        let spool_dir = vars
            .get("ROOMGATE_RECORDING_SPOOL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_RECORDING_SPOOL_DIR));

        let upload_path = vars
            .get("ROOMGATE_RECORDING_UPLOAD_PATH")
            .cloned()
            .unwrap_or_else(|| "/upload".to_string());

        let bucket = vars
            .get("ROOMGATE_RECORDING_BUCKET")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnvVar("ROOMGATE_RECORDING_BUCKET".to_string()))?;

        let storage_path_template = vars
            .get("ROOMGATE_RECORDING_STORAGE_PATH")
            .cloned()
            .unwrap_or_else(|| "recordings/{sessionId}.mp4".to_string());

        if !storage_path_template.contains(crate::recording::SESSION_ID_PLACEHOLDER) {
            return Err(ConfigError::InvalidRecording(format!(
                "ROOMGATE_RECORDING_STORAGE_PATH must contain the '{}' placeholder, got '{storage_path_template}'",
                crate::recording::SESSION_ID_PLACEHOLDER
            )));
        }

        // The finalize step reports completion through the same backend
        // recording endpoint unless told otherwise.
        let webhook_url = vars
            .get("ROOMGATE_RECORDING_WEBHOOK_URL")
            .cloned()
            .unwrap_or_else(|| format!("{backend_base_url}/recording"));

        let recording_webhook_secret = vars
            .get("ROOMGATE_RECORDING_WEBHOOK_SECRET")
            .map(|s| SecretString::from(s.as_str()))
            .unwrap_or_else(|| webhook_secret.clone());

        Ok(Some(RecordingConfig {
            spool_dir,
            file_service_url: file_service_url.clone(),
            upload_path,
            bucket,
            storage_path_template,
            webhook_url,
            webhook_secret: recording_webhook_secret,
        }))
    }
}
