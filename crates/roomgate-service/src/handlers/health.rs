//! Health check handler.

use crate::errors::RoomgateError;
use crate::routes::AppState;
use axum::extract::State;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

/// Health check response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    /// Number of rooms currently tracked by the registry.
    pub active_rooms: usize,
    /// Whether recording upload handoff is configured.
    pub recording_configured: bool,
}

/// Health check handler.
///
/// Round-trips the registry mailbox, so a healthy response means the actor
/// system is processing messages.
#[instrument(skip_all, name = "roomgate.health.check")]
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> Result<Json<HealthResponse>, RoomgateError> {
    let status = state.registry.status().await?;

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        active_rooms: status.active_rooms,
        recording_configured: state.recording_configured,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response_wire_names() {
        let response = HealthResponse {
            status: "healthy".to_string(),
            active_rooms: 3,
            recording_configured: true,
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["activeRooms"], 3);
        assert_eq!(json["recordingConfigured"], true);
    }
}
