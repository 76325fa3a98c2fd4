//! Wire payloads for the backend webhook protocol.
//!
//! All payloads use camelCase field names on the wire. Inbound payloads
//! tolerate unknown fields; the configuration snapshot goes further and
//! preserves unrecognized keys as an open feature-toggle mapping, so new
//! backend toggles require no schema change here.

use common::types::{MeetingId, RecordingSessionId, RoomName};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Path of the synchronous access-validation endpoint.
pub const VALIDATE_ACCESS_PATH: &str = "/validate-access";

/// Lifecycle event kinds delivered to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    RoomCreated,
    UserJoined,
    UserLeft,
    RoomDestroyed,
    ModeratorChanged,
    RecordingStatus,
}

impl EventKind {
    /// Endpoint path for this event kind.
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            EventKind::RoomCreated => "/room-created",
            EventKind::UserJoined => "/user-joined",
            EventKind::UserLeft => "/user-left",
            EventKind::RoomDestroyed => "/room-destroyed",
            EventKind::ModeratorChanged => "/moderator-changed",
            EventKind::RecordingStatus => "/recording",
        }
    }

    /// Event name for logging.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::RoomCreated => "room-created",
            EventKind::UserJoined => "user-joined",
            EventKind::UserLeft => "user-left",
            EventKind::RoomDestroyed => "room-destroyed",
            EventKind::ModeratorChanged => "moderator-changed",
            EventKind::RecordingStatus => "recording-status",
        }
    }
}

/// Current unix timestamp in milliseconds, stamped on every payload.
#[must_use]
pub fn unix_timestamp_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn default_is_public() -> bool {
    true
}

/// Backend-supplied room configuration.
///
/// Returned by `/room-created` and optionally embedded in the
/// `/validate-access` response. Immutable once applied to a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationSnapshot {
    /// Room privacy flag; private rooms are members-only.
    #[serde(default = "default_is_public")]
    pub is_public: bool,

    /// Identities to grant moderator affiliation.
    #[serde(default)]
    pub moderators: Vec<String>,

    /// Maximum room lifetime in minutes; arms the duration timer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_duration_minutes: Option<u64>,

    /// Opaque backend meeting key, used for recording correlation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meeting_id: Option<MeetingId>,

    /// Room subject (meeting title).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    /// Discussion history retention.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_length: Option<u32>,

    /// Open feature-toggle mapping (chat, whiteboard, screen-share,
    /// lobby, ...). Keys this version does not know about are preserved
    /// verbatim.
    #[serde(flatten)]
    pub features: BTreeMap<String, serde_json::Value>,
}

impl Default for ConfigurationSnapshot {
    fn default() -> Self {
        Self {
            is_public: true,
            moderators: Vec::new(),
            max_duration_minutes: None,
            meeting_id: None,
            subject: None,
            history_length: None,
            features: BTreeMap::new(),
        }
    }
}

/// `/room-created` request body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomCreatedEvent {
    pub room_name: RoomName,
    pub timestamp: i64,
}

/// `/validate-access` request body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateAccessRequest {
    pub room_name: RoomName,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meeting_id: Option<MeetingId>,
    pub user_jid: String,
    pub user_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bearer_token: Option<String>,
    pub timestamp: i64,
}

/// `/validate-access` response body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateAccessResponse {
    pub allowed: bool,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub require_auth: bool,
    #[serde(default)]
    pub redirect_url: Option<String>,
    #[serde(default)]
    pub configuration: Option<ConfigurationSnapshot>,
}

/// `/user-joined` request body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserJoinedEvent {
    pub room_name: RoomName,
    pub user_jid: String,
    pub user_name: String,
    pub is_moderator: bool,
    pub timestamp: i64,
}

/// `/user-left` request body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLeftEvent {
    pub room_name: RoomName,
    pub user_jid: String,
    pub timestamp: i64,
}

/// `/room-destroyed` request body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDestroyedEvent {
    pub room_name: RoomName,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub timestamp: i64,
}

/// `/moderator-changed` request body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeratorChangedEvent {
    pub room_name: RoomName,
    pub user_jid: String,
    pub is_moderator: bool,
    pub timestamp: i64,
}

/// Recording session lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingStatus {
    Started,
    Stopped,
    Failed,
}

/// `/recording` request body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingStatusEvent {
    pub room_name: RoomName,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meeting_id: Option<MeetingId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<RecordingSessionId>,
    pub status: RecordingStatus,
    pub timestamp: i64,
}
