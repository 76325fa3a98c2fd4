//! Message types for the room actor system.
//!
//! All communication with room actors and the registry uses typed message
//! passing over `tokio::sync::mpsc`; request-reply uses
//! `tokio::sync::oneshot`.

use super::room::RoomActorHandle;
use crate::errors::RoomgateError;
use crate::validator::{AccessDecision, PreJoinRequest};
use crate::webhook::payloads::RecordingStatus;
use crate::webhook::ConfigurationSnapshot;
use common::types::{MeetingId, RecordingSessionId, RoomName};
use serde::Serialize;
use std::collections::BTreeMap;
use tokio::sync::oneshot;

/// Messages handled by a `RoomActor`.
#[derive(Debug)]
pub enum RoomMessage {
    /// A participant wants to join; blocks until a decision is made.
    PreJoin {
        request: PreJoinRequest,
        respond_to: oneshot::Sender<AccessDecision>,
    },

    /// Hand a backend configuration snapshot to the apply-once cache.
    ApplyConfiguration { snapshot: ConfigurationSnapshot },

    /// An admitted participant entered the room.
    OccupantJoined {
        user_jid: String,
        user_name: String,
        is_moderator: bool,
    },

    /// A participant left the room.
    OccupantLeft { user_jid: String },

    /// A participant's moderator affiliation changed.
    AffiliationChanged {
        user_jid: String,
        is_moderator: bool,
    },

    /// Recording state reported by the host or the finalize step.
    /// Responds with the session id the status was attributed to.
    RecordingStatus {
        status: RecordingStatus,
        session_id: Option<RecordingSessionId>,
        respond_to: oneshot::Sender<Option<RecordingSessionId>>,
    },

    /// Read the room's effective settings.
    GetState {
        respond_to: oneshot::Sender<RoomStateView>,
    },

    /// Destroy the room. Terminal; the actor exits after responding.
    Destroy {
        reason: String,
        respond_to: oneshot::Sender<()>,
    },
}

/// Messages handled by the `RoomRegistry`.
#[derive(Debug)]
pub enum RegistryMessage {
    /// Track a newly created room and fire the room-created webhook.
    CreateRoom {
        room_name: RoomName,
        respond_to: oneshot::Sender<Result<(), RoomgateError>>,
    },

    /// Resolve a room name to its actor handle.
    GetRoom {
        room_name: RoomName,
        respond_to: oneshot::Sender<Option<RoomActorHandle>>,
    },

    /// Destroy a room. Responds `false` when the room is unknown, which
    /// makes late duration-timer fires a no-op.
    DestroyRoom {
        room_name: RoomName,
        reason: String,
        respond_to: oneshot::Sender<bool>,
    },

    /// Registry occupancy, for health reporting.
    GetStatus {
        respond_to: oneshot::Sender<RegistryStatus>,
    },

    /// Graceful shutdown: cancel all rooms and exit.
    Shutdown { respond_to: oneshot::Sender<()> },
}

/// Registry occupancy snapshot.
#[derive(Debug, Clone, Copy)]
pub struct RegistryStatus {
    pub active_rooms: usize,
}

/// Read-only view of a room's effective settings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomStateView {
    pub room_name: RoomName,
    pub is_public: bool,
    /// Whether a configuration snapshot has been applied.
    pub configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meeting_id: Option<MeetingId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_duration_minutes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_length: Option<u32>,
    pub moderators: Vec<String>,
    pub features: BTreeMap<String, serde_json::Value>,
    pub participant_count: usize,
    pub recording_active: bool,
}
