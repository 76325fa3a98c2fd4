//! HTTP routes for the Roomgate hook API.
//!
//! Defines the Axum router and application state.

use crate::handlers;
use crate::rooms::RegistryHandle;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Handle to the room registry actor.
    pub registry: RegistryHandle,

    /// Whether recording upload handoff is configured, for health
    /// reporting.
    pub recording_configured: bool,
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/v1/health` - Health check (registry round trip)
/// - `/v1/rooms/{roomName}` - Room state inspection
/// - `/v1/hooks/*` - Lifecycle hooks called by the host
/// - TraceLayer for request logging
/// - 30 second request timeout
pub fn build_routes(state: Arc<AppState>) -> Router {
    let routes = Router::new()
        .route("/v1/health", get(handlers::health_check))
        .route("/v1/rooms/:room_name", get(handlers::get_room_state))
        .route("/v1/hooks/room-created", post(handlers::room_created))
        .route("/v1/hooks/pre-join", post(handlers::pre_join))
        .route("/v1/hooks/occupant-joined", post(handlers::occupant_joined))
        .route("/v1/hooks/occupant-left", post(handlers::occupant_left))
        .route(
            "/v1/hooks/affiliation-changed",
            post(handlers::affiliation_changed),
        )
        .route("/v1/hooks/recording", post(handlers::recording))
        .route("/v1/hooks/room-destroyed", post(handlers::room_destroyed))
        .with_state(state);

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - Timeout the request (innermost)
    // 2. TraceLayer - Log request details
    //
    // The 30s outer timeout comfortably exceeds the per-call backend
    // timeout, so a slow backend surfaces as a validation failure, not a
    // severed hook connection.
    routes
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_is_clone() {
        // Required for Axum's State extractor
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }
}
