//! Room lifecycle integration tests.
//!
//! Exercises the registry and room actors end to end:
//!
//! - apply-once configuration semantics
//! - the private-room short-circuit (no backend call without a credential)
//! - the one-shot duration timer, with `tokio::time` paused
//! - exactly-one room-destroyed notification
//! - recording upload-descriptor provisioning and release
//!
//! Timer tests point the webhook client at an unroutable address so paused
//! virtual time never interacts with HTTP mock delays.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use common::types::RoomName;
use roomgate_service::config::{Config, RecordingConfig};
use roomgate_service::recording::RecordingPipeline;
use roomgate_service::rooms::{RegistryHandle, RoomRegistry, DURATION_LIMIT_REASON};
use roomgate_service::validator::{AccessValidator, DecisionReason, PreJoinRequest};
use roomgate_service::webhook::{ConfigurationSnapshot, WebhookClient, WebhookDispatcher};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Test Helpers
// ============================================================================

fn test_config(backend_url: &str) -> Config {
    let vars = HashMap::from([
        ("ROOMGATE_BACKEND_URL".to_string(), backend_url.to_string()),
        (
            "ROOMGATE_WEBHOOK_SECRET".to_string(),
            "test-secret".to_string(),
        ),
    ]);
    Config::from_vars(&vars).expect("test config should load")
}

fn spawn_registry(backend_url: &str, recording: Option<RecordingConfig>) -> RegistryHandle {
    let config = test_config(backend_url);
    let client = WebhookClient::new(&config).expect("client should build");
    let dispatcher = WebhookDispatcher::new(client.clone());
    let validator = AccessValidator::new(client, config.fail_policy);
    let pipeline = RecordingPipeline::new(recording);

    let (handle, _task) = RoomRegistry::spawn(dispatcher, validator, pipeline);
    handle
}

fn snapshot(subject: &str, max_duration_minutes: Option<u64>) -> ConfigurationSnapshot {
    ConfigurationSnapshot {
        subject: Some(subject.to_string()),
        max_duration_minutes,
        ..ConfigurationSnapshot::default()
    }
}

fn anonymous_join() -> PreJoinRequest {
    serde_json::from_value(serde_json::json!({
        "userJid": "guest@example.com",
        "userName": "Guest"
    }))
    .unwrap()
}

/// Mount a default 200 handler for lifecycle notification endpoints.
async fn mount_event_sink(server: &MockServer) {
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

// ============================================================================
// Configuration Apply-Once
// ============================================================================

#[tokio::test]
async fn test_configuration_applies_at_most_once() {
    let mock_server = MockServer::start().await;
    mount_event_sink(&mock_server).await;

    let registry = spawn_registry(&mock_server.uri(), None);
    let room_name = RoomName::from("apply-once");
    registry.create_room(room_name.clone()).await.unwrap();
    let room = registry.room(room_name).await.unwrap().expect("room tracked");

    room.apply_configuration(snapshot("First", None)).await.unwrap();
    room.apply_configuration(snapshot("Second", None)).await.unwrap();

    let state = room.get_state().await.unwrap();
    assert!(state.configured);
    assert_eq!(state.subject.as_deref(), Some("First"));
}

#[tokio::test]
async fn test_concurrent_first_joiners_apply_one_snapshot() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/room-created"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;
    // Every validation response embeds a snapshot; only one may stick
    Mock::given(method("POST"))
        .and(path("/validate-access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "allowed": true,
            "configuration": {"subject": "From validation", "historyLength": 20}
        })))
        .mount(&mock_server)
        .await;

    let registry = spawn_registry(&mock_server.uri(), None);
    let room_name = RoomName::from("rush-join");
    registry.create_room(room_name.clone()).await.unwrap();
    let room = registry.room(room_name).await.unwrap().expect("room tracked");

    let joins = (0..4).map(|i| {
        let room = room.clone();
        async move {
            let request: PreJoinRequest = serde_json::from_value(serde_json::json!({
                "userJid": format!("user{i}@example.com"),
                "urlToken": "tok"
            }))
            .unwrap();
            room.pre_join(request).await.unwrap()
        }
    });

    let decisions = futures::future::join_all(joins).await;
    assert!(decisions.iter().all(|decision| decision.allowed));

    let state = room.get_state().await.unwrap();
    assert!(state.configured);
    assert_eq!(state.subject.as_deref(), Some("From validation"));
    assert_eq!(state.history_length, Some(20));
}

#[tokio::test]
async fn test_room_created_response_configures_room() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/room-created"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "isPublic": false,
            "subject": "From backend",
            "moderators": ["host@example.com"],
            "chat": true
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let registry = spawn_registry(&mock_server.uri(), None);
    let room_name = RoomName::from("configured-on-create");
    registry.create_room(room_name.clone()).await.unwrap();
    let room = registry.room(room_name).await.unwrap().expect("room tracked");

    // The room-created webhook is asynchronous; poll until it lands
    let mut state = room.get_state().await.unwrap();
    for _ in 0..50 {
        if state.configured {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        state = room.get_state().await.unwrap();
    }

    assert!(state.configured);
    assert!(!state.is_public);
    assert_eq!(state.subject.as_deref(), Some("From backend"));
    assert_eq!(state.moderators, vec!["host@example.com"]);
    assert_eq!(
        state.features.get("chat"),
        Some(&serde_json::json!(true))
    );
}

#[tokio::test]
async fn test_duplicate_room_creation_is_idempotent() {
    let mock_server = MockServer::start().await;
    mount_event_sink(&mock_server).await;

    let registry = spawn_registry(&mock_server.uri(), None);
    let room_name = RoomName::from("dup-create");

    registry.create_room(room_name.clone()).await.unwrap();
    registry.create_room(room_name.clone()).await.unwrap();

    let status = registry.status().await.unwrap();
    assert_eq!(status.active_rooms, 1);
}

// ============================================================================
// Private-Room Short-Circuit
// ============================================================================

#[tokio::test]
async fn test_private_room_denies_anonymous_join_without_backend_call() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/room-created"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;
    // The short-circuit must not consult the backend at all
    Mock::given(method("POST"))
        .and(path("/validate-access"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"allowed": true})),
        )
        .expect(0)
        .mount(&mock_server)
        .await;

    let registry = spawn_registry(&mock_server.uri(), None);
    let room_name = RoomName::from("private-room");
    registry.create_room(room_name.clone()).await.unwrap();
    let room = registry.room(room_name).await.unwrap().expect("room tracked");

    let private = ConfigurationSnapshot {
        is_public: false,
        ..ConfigurationSnapshot::default()
    };
    room.apply_configuration(private).await.unwrap();

    let decision = room.pre_join(anonymous_join()).await.unwrap();
    assert!(!decision.allowed);
    assert!(decision.require_auth);
    assert_eq!(decision.reason, DecisionReason::AuthRequired);
}

// ============================================================================
// Duration Timer
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_duration_timer_destroys_room_at_limit() {
    // Unroutable backend: webhook sends fail fast and touch no timers
    let registry = spawn_registry("http://127.0.0.1:9", None);
    let room_name = RoomName::from("timed-room");
    registry.create_room(room_name.clone()).await.unwrap();
    let room = registry
        .room(room_name.clone())
        .await
        .unwrap()
        .expect("room tracked");

    room.apply_configuration(snapshot("Timed", Some(60))).await.unwrap();
    let state = room.get_state().await.unwrap();
    assert_eq!(state.max_duration_minutes, Some(60));

    // Just before the limit the room is still alive
    tokio::time::sleep(Duration::from_secs(59 * 60)).await;
    assert!(registry.room(room_name.clone()).await.unwrap().is_some());

    // Crossing the limit destroys it
    tokio::time::sleep(Duration::from_secs(2 * 60)).await;
    assert!(registry.room(room_name.clone()).await.unwrap().is_none());

    // A late destroy for the already-gone room is a no-op
    let destroyed = registry
        .destroy_room(room_name, DURATION_LIMIT_REASON.to_string())
        .await;
    assert!(!destroyed);
}

#[tokio::test(start_paused = true)]
async fn test_early_destruction_cancels_duration_timer() {
    let registry = spawn_registry("http://127.0.0.1:9", None);
    let room_name = RoomName::from("short-lived");
    registry.create_room(room_name.clone()).await.unwrap();
    let room = registry
        .room(room_name.clone())
        .await
        .unwrap()
        .expect("room tracked");
    room.apply_configuration(snapshot("Short", Some(60))).await.unwrap();

    let destroyed = registry
        .destroy_room(room_name.clone(), "host closed".to_string())
        .await;
    assert!(destroyed);

    // Re-create the room under the same name; the old timer must not
    // reach across and destroy it
    registry.create_room(room_name.clone()).await.unwrap();
    tokio::time::sleep(Duration::from_secs(2 * 60 * 60)).await;
    assert!(registry.room(room_name).await.unwrap().is_some());
}

#[tokio::test(start_paused = true)]
async fn test_rooms_without_duration_limit_never_expire() {
    let registry = spawn_registry("http://127.0.0.1:9", None);
    let room_name = RoomName::from("open-ended");
    registry.create_room(room_name.clone()).await.unwrap();
    let room = registry
        .room(room_name.clone())
        .await
        .unwrap()
        .expect("room tracked");
    room.apply_configuration(snapshot("Open", None)).await.unwrap();

    tokio::time::sleep(Duration::from_secs(24 * 60 * 60)).await;
    assert!(registry.room(room_name).await.unwrap().is_some());
}

#[tokio::test(start_paused = true)]
async fn test_full_room_lifetime_with_timed_destruction() {
    // Fail-open so the pre-join resolves without a reachable backend
    let vars = HashMap::from([
        (
            "ROOMGATE_BACKEND_URL".to_string(),
            "http://127.0.0.1:9".to_string(),
        ),
        (
            "ROOMGATE_WEBHOOK_SECRET".to_string(),
            "test-secret".to_string(),
        ),
        ("ROOMGATE_FAIL_POLICY".to_string(), "fail_open".to_string()),
    ]);
    let config = Config::from_vars(&vars).unwrap();
    let client = WebhookClient::new(&config).unwrap();
    let dispatcher = WebhookDispatcher::new(client.clone());
    let validator = AccessValidator::new(client, config.fail_policy);
    let (registry, _task) =
        RoomRegistry::spawn(dispatcher, validator, RecordingPipeline::new(None));

    let room_name = RoomName::from("full-lifetime");
    registry.create_room(room_name.clone()).await.unwrap();
    let room = registry
        .room(room_name.clone())
        .await
        .unwrap()
        .expect("room tracked");

    let decision = room.pre_join(anonymous_join()).await.unwrap();
    assert!(decision.allowed);

    room.apply_configuration(snapshot("Timed", Some(30))).await.unwrap();
    tokio::time::sleep(Duration::from_secs(31 * 60)).await;

    // Destroyed at the limit; later joins find no room
    assert!(registry.room(room_name.clone()).await.unwrap().is_none());
    assert!(room.pre_join(anonymous_join()).await.is_err());
}

// ============================================================================
// Destroy Notification
// ============================================================================

#[tokio::test]
async fn test_destruction_fires_exactly_one_notification() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/room-created"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/room-destroyed"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let registry = spawn_registry(&mock_server.uri(), None);
    let room_name = RoomName::from("once-destroyed");
    registry.create_room(room_name.clone()).await.unwrap();

    assert!(
        registry
            .destroy_room(room_name.clone(), "host closed".to_string())
            .await
    );
    // Duplicate destroy is a no-op and must not re-notify
    assert!(
        !registry
            .destroy_room(room_name, "host closed".to_string())
            .await
    );

    // Let the spawned destroy protocol and webhook send complete before
    // wiremock verifies expectations on drop
    tokio::time::sleep(Duration::from_millis(300)).await;
}

// ============================================================================
// Recording Handoff
// ============================================================================

fn recording_config(spool_dir: PathBuf) -> RecordingConfig {
    let vars = HashMap::from([
        (
            "ROOMGATE_BACKEND_URL".to_string(),
            "http://127.0.0.1:9".to_string(),
        ),
        (
            "ROOMGATE_WEBHOOK_SECRET".to_string(),
            "test-secret".to_string(),
        ),
        (
            "ROOMGATE_RECORDING_FILE_SERVICE_URL".to_string(),
            "https://files.example.com".to_string(),
        ),
        (
            "ROOMGATE_RECORDING_BUCKET".to_string(),
            "meetings".to_string(),
        ),
        (
            "ROOMGATE_RECORDING_SPOOL_DIR".to_string(),
            spool_dir.display().to_string(),
        ),
    ]);
    Config::from_vars(&vars)
        .expect("test config should load")
        .recording
        .expect("recording block present")
}

#[tokio::test]
async fn test_recording_session_provisions_and_releases_descriptor() {
    use roomgate_service::webhook::RecordingStatus;

    let spool = tempfile::tempdir().unwrap();
    let registry = spawn_registry(
        "http://127.0.0.1:9",
        Some(recording_config(spool.path().to_path_buf())),
    );
    let room_name = RoomName::from("recorded-room");
    registry.create_room(room_name.clone()).await.unwrap();
    let room = registry.room(room_name).await.unwrap().expect("room tracked");

    // Start mints a session and writes the descriptor
    let session_id = room
        .recording_status(RecordingStatus::Started, None)
        .await
        .unwrap()
        .expect("session attributed");
    let descriptor = spool.path().join(format!("recording-{session_id}.json"));
    assert!(descriptor.exists());

    let state = room.get_state().await.unwrap();
    assert!(state.recording_active);

    // A duplicate start keeps the existing session
    let again = room
        .recording_status(RecordingStatus::Started, None)
        .await
        .unwrap();
    assert_eq!(again, Some(session_id));

    // Stop releases the descriptor and closes the session
    let stopped = room
        .recording_status(RecordingStatus::Stopped, Some(session_id))
        .await
        .unwrap();
    assert_eq!(stopped, Some(session_id));
    assert!(!descriptor.exists());

    let state = room.get_state().await.unwrap();
    assert!(!state.recording_active);
}
