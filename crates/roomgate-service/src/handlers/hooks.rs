//! Room lifecycle hook handlers.
//!
//! The host calls these endpoints synchronously at each lifecycle point:
//!
//! - `POST /v1/hooks/room-created` - start tracking a room
//! - `POST /v1/hooks/pre-join` - blocking admission decision
//! - `POST /v1/hooks/occupant-joined` - participant entered
//! - `POST /v1/hooks/occupant-left` - participant left
//! - `POST /v1/hooks/affiliation-changed` - moderator grant/revoke
//! - `POST /v1/hooks/recording` - recording state change
//! - `POST /v1/hooks/room-destroyed` - stop tracking a room
//!
//! Only pre-join blocks on backend work; the other hooks acknowledge as
//! soon as the room actor has accepted the event.

use crate::errors::RoomgateError;
use crate::rooms::RoomActorHandle;
use crate::routes::AppState;
use crate::validator::{AccessDecision, PreJoinRequest};
use crate::webhook::RecordingStatus;
use axum::extract::State;
use axum::Json;
use common::types::{RecordingSessionId, RoomName};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;

/// Generic acknowledgement body for event hooks.
#[derive(Debug, Serialize)]
pub struct AckResponse {
    pub status: &'static str,
}

impl AckResponse {
    fn ok() -> Json<Self> {
        Json(Self { status: "ok" })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomCreatedHook {
    pub room_name: RoomName,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreJoinHook {
    pub room_name: RoomName,
    #[serde(flatten)]
    pub request: PreJoinRequest,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OccupantJoinedHook {
    pub room_name: RoomName,
    pub user_jid: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub is_moderator: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OccupantLeftHook {
    pub room_name: RoomName,
    pub user_jid: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffiliationChangedHook {
    pub room_name: RoomName,
    pub user_jid: String,
    pub is_moderator: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDestroyedHook {
    pub room_name: RoomName,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingHook {
    pub room_name: RoomName,
    pub status: RecordingStatus,
    #[serde(default)]
    pub session_id: Option<RecordingSessionId>,
}

/// Response to the recording hook: the session id the status was
/// attributed to, which the host echoes into later status reports.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingHookResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<RecordingSessionId>,
}

/// Response to the room-destroyed hook.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDestroyedResponse {
    /// `false` when the room was already gone (destruction is idempotent).
    pub destroyed: bool,
}

/// Handler for POST /v1/hooks/room-created.
///
/// Idempotent: re-creating a tracked room is acknowledged without effect.
/// The room-created webhook to the backend fires asynchronously; this
/// hook never blocks room creation on the backend.
#[instrument(skip_all, name = "roomgate.hooks.room_created", fields(room = %hook.room_name))]
pub async fn room_created(
    State(state): State<Arc<AppState>>,
    Json(hook): Json<RoomCreatedHook>,
) -> Result<Json<AckResponse>, RoomgateError> {
    state.registry.create_room(hook.room_name).await?;
    Ok(AckResponse::ok())
}

/// Handler for POST /v1/hooks/pre-join.
///
/// Blocks until the admission decision resolves; the response body is the
/// decision. Always 200 for a tracked room, allow and deny alike.
#[instrument(skip_all, name = "roomgate.hooks.pre_join", fields(room = %hook.room_name))]
pub async fn pre_join(
    State(state): State<Arc<AppState>>,
    Json(hook): Json<PreJoinHook>,
) -> Result<Json<AccessDecision>, RoomgateError> {
    let room = lookup_room(&state, hook.room_name).await?;
    let decision = room.pre_join(hook.request).await?;
    Ok(Json(decision))
}

/// Handler for POST /v1/hooks/occupant-joined.
#[instrument(skip_all, name = "roomgate.hooks.occupant_joined", fields(room = %hook.room_name))]
pub async fn occupant_joined(
    State(state): State<Arc<AppState>>,
    Json(hook): Json<OccupantJoinedHook>,
) -> Result<Json<AckResponse>, RoomgateError> {
    let room = lookup_room(&state, hook.room_name).await?;
    room.occupant_joined(hook.user_jid, hook.user_name, hook.is_moderator)
        .await?;
    Ok(AckResponse::ok())
}

/// Handler for POST /v1/hooks/occupant-left.
#[instrument(skip_all, name = "roomgate.hooks.occupant_left", fields(room = %hook.room_name))]
pub async fn occupant_left(
    State(state): State<Arc<AppState>>,
    Json(hook): Json<OccupantLeftHook>,
) -> Result<Json<AckResponse>, RoomgateError> {
    let room = lookup_room(&state, hook.room_name).await?;
    room.occupant_left(hook.user_jid).await?;
    Ok(AckResponse::ok())
}

/// Handler for POST /v1/hooks/affiliation-changed.
#[instrument(skip_all, name = "roomgate.hooks.affiliation_changed", fields(room = %hook.room_name))]
pub async fn affiliation_changed(
    State(state): State<Arc<AppState>>,
    Json(hook): Json<AffiliationChangedHook>,
) -> Result<Json<AckResponse>, RoomgateError> {
    let room = lookup_room(&state, hook.room_name).await?;
    room.affiliation_changed(hook.user_jid, hook.is_moderator)
        .await?;
    Ok(AckResponse::ok())
}

/// Handler for POST /v1/hooks/recording.
///
/// Start provisions the upload descriptor; stop/failed releases it. The
/// response carries the session id the status was attributed to so the
/// host can correlate later reports.
#[instrument(skip_all, name = "roomgate.hooks.recording", fields(room = %hook.room_name))]
pub async fn recording(
    State(state): State<Arc<AppState>>,
    Json(hook): Json<RecordingHook>,
) -> Result<Json<RecordingHookResponse>, RoomgateError> {
    let room = lookup_room(&state, hook.room_name).await?;
    let session_id = room.recording_status(hook.status, hook.session_id).await?;
    Ok(Json(RecordingHookResponse { session_id }))
}

/// Handler for POST /v1/hooks/room-destroyed.
///
/// Idempotent: destroying an unknown room answers `destroyed: false`
/// instead of an error, since the duration timer may have beaten the host
/// to it.
#[instrument(skip_all, name = "roomgate.hooks.room_destroyed", fields(room = %hook.room_name))]
pub async fn room_destroyed(
    State(state): State<Arc<AppState>>,
    Json(hook): Json<RoomDestroyedHook>,
) -> Result<Json<RoomDestroyedResponse>, RoomgateError> {
    let reason = hook.reason.unwrap_or_else(|| "destroyed by host".to_string());
    let destroyed = state.registry.destroy_room(hook.room_name, reason).await;
    Ok(Json(RoomDestroyedResponse { destroyed }))
}

async fn lookup_room(state: &AppState, room_name: RoomName) -> Result<RoomActorHandle, RoomgateError> {
    state
        .registry
        .room(room_name.clone())
        .await?
        .ok_or_else(|| RoomgateError::RoomNotFound(room_name.to_string()))
}
