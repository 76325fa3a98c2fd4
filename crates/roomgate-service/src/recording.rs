//! Recording handoff pipeline.
//!
//! Roomgate's responsibility ends at producing a complete upload
//! descriptor: a JSON file in the spool directory that the external
//! finalize process reads to upload the artifact. The finalize step
//! reports completion back through the recording hook, at which point the
//! descriptor is deleted.

use crate::config::RecordingConfig;
use common::types::{MeetingId, RecordingSessionId, RoomName};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Placeholder substituted with the session id in the storage path
/// template.
pub const SESSION_ID_PLACEHOLDER: &str = "{sessionId}";

/// Upload destination block of the descriptor. Fixed, documented schema;
/// consumed by the external finalize step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadTarget {
    pub file_service_url: String,
    pub upload_path: String,
    pub bucket: String,
    pub storage_path: String,
    pub webhook_url: String,
    pub webhook_secret: String,
}

/// The upload descriptor written for one recording session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadDescriptor {
    pub room_name: RoomName,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meeting_id: Option<MeetingId>,
    pub session_id: RecordingSessionId,
    pub recording_upload_config: UploadTarget,
}

/// Descriptor provisioning failures.
///
/// These never block the recording-status notification to the backend;
/// the room actor logs them as provisioning errors.
#[derive(Debug, Error)]
pub enum RecordingError {
    #[error("recording upload is not configured")]
    NotConfigured,

    #[error("failed to write upload descriptor: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode upload descriptor: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Builds, writes, and removes upload descriptors.
#[derive(Clone)]
pub struct RecordingPipeline {
    config: Option<Arc<RecordingConfig>>,
}

impl RecordingPipeline {
    #[must_use]
    pub fn new(config: Option<RecordingConfig>) -> Self {
        Self {
            config: config.map(Arc::new),
        }
    }

    /// Whether an upload destination is configured.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.config.is_some()
    }

    /// Spool file path for a session's descriptor.
    #[must_use]
    pub fn descriptor_path(&self, session_id: RecordingSessionId) -> Option<PathBuf> {
        self.config
            .as_ref()
            .map(|config| config.spool_dir.join(format!("recording-{session_id}.json")))
    }

    /// Build the descriptor for a new recording session and write it where
    /// the finalize step can read it.
    ///
    /// # Errors
    ///
    /// `NotConfigured` when no upload destination is set; `Io`/`Encode`
    /// when the spool file cannot be produced.
    pub async fn provision(
        &self,
        room_name: &RoomName,
        meeting_id: Option<&MeetingId>,
        session_id: RecordingSessionId,
    ) -> Result<PathBuf, RecordingError> {
        let config = self.config.as_ref().ok_or(RecordingError::NotConfigured)?;
        let descriptor = build_descriptor(config, room_name, meeting_id, session_id);

        tokio::fs::create_dir_all(&config.spool_dir).await?;
        let path = config
            .spool_dir
            .join(format!("recording-{session_id}.json"));
        let encoded = serde_json::to_vec_pretty(&descriptor)?;
        tokio::fs::write(&path, encoded).await?;

        info!(
            target: "roomgate.recording",
            room = %room_name,
            session_id = %session_id,
            path = %path.display(),
            "Upload descriptor provisioned"
        );
        Ok(path)
    }

    /// Delete a session's descriptor after the finalize step reports
    /// completion. Returns `false` when no descriptor existed.
    ///
    /// # Errors
    ///
    /// `Io` for filesystem failures other than the file being absent.
    pub async fn discard(&self, session_id: RecordingSessionId) -> Result<bool, RecordingError> {
        let Some(path) = self.descriptor_path(session_id) else {
            return Ok(false);
        };

        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(RecordingError::Io(e)),
        }
    }
}

fn build_descriptor(
    config: &RecordingConfig,
    room_name: &RoomName,
    meeting_id: Option<&MeetingId>,
    session_id: RecordingSessionId,
) -> UploadDescriptor {
    use common::secret::ExposeSecret;

    let storage_path = config
        .storage_path_template
        .replace(SESSION_ID_PLACEHOLDER, &session_id.to_string());

    UploadDescriptor {
        room_name: room_name.clone(),
        meeting_id: meeting_id.cloned(),
        session_id,
        recording_upload_config: UploadTarget {
            file_service_url: config.file_service_url.clone(),
            upload_path: config.upload_path.clone(),
            bucket: config.bucket.clone(),
            storage_path,
            webhook_url: config.webhook_url.clone(),
            // Written in clear for the external uploader; the spool
            // directory is the trust boundary.
            webhook_secret: config.webhook_secret.expose_secret().to_string(),
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use common::secret::SecretString;

    fn test_config(spool_dir: PathBuf) -> RecordingConfig {
        RecordingConfig {
            spool_dir,
            file_service_url: "https://files.example.com".to_string(),
            upload_path: "/upload".to_string(),
            bucket: "meetings".to_string(),
            storage_path_template: "recordings/{sessionId}.mp4".to_string(),
            webhook_url: "https://backend.example.com/api/recording".to_string(),
            webhook_secret: SecretString::from("finalize-secret"),
        }
    }

    #[test]
    fn test_storage_path_substitution() {
        let config = test_config(PathBuf::from("/tmp"));
        let session_id = RecordingSessionId::new();
        let descriptor = build_descriptor(
            &config,
            &RoomName::from("abc-defg"),
            Some(&MeetingId::new("mtg-1")),
            session_id,
        );

        assert_eq!(
            descriptor.recording_upload_config.storage_path,
            format!("recordings/{session_id}.mp4")
        );
    }

    #[test]
    fn test_descriptor_wire_schema() {
        let config = test_config(PathBuf::from("/tmp"));
        let session_id = RecordingSessionId::new();
        let descriptor = build_descriptor(
            &config,
            &RoomName::from("abc-defg"),
            Some(&MeetingId::new("mtg-1")),
            session_id,
        );

        let json = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(json["roomName"], "abc-defg");
        assert_eq!(json["meetingId"], "mtg-1");
        assert_eq!(json["sessionId"], session_id.to_string());

        let upload = &json["recordingUploadConfig"];
        assert_eq!(upload["fileServiceUrl"], "https://files.example.com");
        assert_eq!(upload["uploadPath"], "/upload");
        assert_eq!(upload["bucket"], "meetings");
        assert_eq!(upload["webhookUrl"], "https://backend.example.com/api/recording");
        assert_eq!(upload["webhookSecret"], "finalize-secret");
    }

    #[tokio::test]
    async fn test_provision_and_discard() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = RecordingPipeline::new(Some(test_config(dir.path().to_path_buf())));
        let session_id = RecordingSessionId::new();

        let path = pipeline
            .provision(&RoomName::from("abc-defg"), None, session_id)
            .await
            .unwrap();
        assert!(path.exists());

        let written: UploadDescriptor =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(written.session_id, session_id);

        assert!(pipeline.discard(session_id).await.unwrap());
        assert!(!path.exists());
        // Second discard is a no-op
        assert!(!pipeline.discard(session_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_provision_without_configuration() {
        let pipeline = RecordingPipeline::new(None);
        let result = pipeline
            .provision(&RoomName::from("abc-defg"), None, RecordingSessionId::new())
            .await;

        assert!(matches!(result, Err(RecordingError::NotConfigured)));
        assert!(!pipeline.is_configured());
    }
}
