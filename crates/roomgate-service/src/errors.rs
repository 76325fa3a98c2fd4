//! Roomgate error types.
//!
//! Errors surfaced through the hook API map to HTTP status codes via the
//! `IntoResponse` impl. Messages returned to the host are intentionally
//! generic for internal failures; the real error is logged server-side.
//!
//! Backend-call failures during validation never reach this type: the
//! Access Validator converts them into an allow/deny decision according to
//! the configured fail policy.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Roomgate service error type.
///
/// Maps to HTTP status codes:
/// - `RoomNotFound`: 404 Not Found
/// - `BadRequest`: 400 Bad Request
/// - `Internal`: 500 Internal Server Error
#[derive(Debug, Error)]
pub enum RoomgateError {
    /// The named room is not (or no longer) tracked by the registry.
    #[error("room not found: {0}")]
    RoomNotFound(String),

    /// The hook payload was structurally invalid.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Internal failure (mailbox closed, channel dropped).
    #[error("internal error: {0}")]
    Internal(String),
}

impl RoomgateError {
    /// HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            RoomgateError::RoomNotFound(_) => 404,
            RoomgateError::BadRequest(_) => 400,
            RoomgateError::Internal(_) => 500,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for RoomgateError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            RoomgateError::RoomNotFound(room) => (
                StatusCode::NOT_FOUND,
                "ROOM_NOT_FOUND",
                format!("room not found: {room}"),
            ),
            RoomgateError::BadRequest(reason) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", reason.clone())
            }
            RoomgateError::Internal(err) => {
                // Log the real error server-side, return a generic message
                tracing::error!(target: "roomgate.api", error = %err, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;

    async fn read_body_json(body: Body) -> serde_json::Value {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_display() {
        assert_eq!(
            format!("{}", RoomgateError::RoomNotFound("abc-defg".to_string())),
            "room not found: abc-defg"
        );
        assert_eq!(
            format!("{}", RoomgateError::BadRequest("missing roomName".to_string())),
            "bad request: missing roomName"
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(RoomgateError::RoomNotFound("x".to_string()).status_code(), 404);
        assert_eq!(RoomgateError::BadRequest("x".to_string()).status_code(), 400);
        assert_eq!(RoomgateError::Internal("x".to_string()).status_code(), 500);
    }

    #[tokio::test]
    async fn test_into_response_room_not_found() {
        let response = RoomgateError::RoomNotFound("abc-defg".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = read_body_json(response.into_body()).await;
        assert_eq!(body["error"]["code"], "ROOM_NOT_FOUND");
        assert_eq!(body["error"]["message"], "room not found: abc-defg");
    }

    #[tokio::test]
    async fn test_into_response_internal_is_generic() {
        let response = RoomgateError::Internal("mailbox closed".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = read_body_json(response.into_body()).await;
        assert_eq!(body["error"]["code"], "INTERNAL_ERROR");
        // The channel detail must not leak to the host
        assert_eq!(body["error"]["message"], "An internal error occurred");
    }
}
