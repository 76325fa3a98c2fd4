//! Room state inspection handler.

use crate::errors::RoomgateError;
use crate::rooms::RoomStateView;
use crate::routes::AppState;
use axum::extract::{Path, State};
use axum::Json;
use common::types::RoomName;
use std::sync::Arc;
use tracing::instrument;

/// Handler for GET /v1/rooms/{roomName}.
///
/// Returns the room's effective settings: applied configuration, roster
/// size, and recording state. Read-only; primarily for operators.
#[instrument(skip_all, name = "roomgate.rooms.get_state", fields(room = %room_name))]
pub async fn get_room_state(
    State(state): State<Arc<AppState>>,
    Path(room_name): Path<String>,
) -> Result<Json<RoomStateView>, RoomgateError> {
    let room_name = RoomName::from(room_name);
    let room = state
        .registry
        .room(room_name.clone())
        .await?
        .ok_or_else(|| RoomgateError::RoomNotFound(room_name.to_string()))?;

    let view = room.get_state().await?;
    Ok(Json(view))
}
