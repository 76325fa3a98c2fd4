//! Common data types for Roomgate components.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique name of a room on the host server.
///
/// Room names are assigned by the host and stable for the room's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomName(String);

impl RoomName {
    /// Wrap a host-assigned room name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The room name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for RoomName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Opaque backend key for a meeting, used for recording correlation.
///
/// The backend mints this value; Roomgate never interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MeetingId(String);

impl MeetingId {
    /// Wrap a backend-assigned meeting identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MeetingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier for a recording session.
///
/// UUIDv7, so identifiers sort by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordingSessionId(Uuid);

impl RecordingSessionId {
    /// Mint a new time-ordered session identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RecordingSessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordingSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_room_name_serializes_transparently() {
        let name = RoomName::from("abc-defg");
        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, "\"abc-defg\"");

        let back: RoomName = serde_json::from_str(&json).unwrap();
        assert_eq!(back, name);
    }

    #[test]
    fn test_meeting_id_round_trip() {
        let id = MeetingId::new("mtg-1234");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"mtg-1234\"");
        assert_eq!(id.as_str(), "mtg-1234");
    }

    #[test]
    fn test_recording_session_ids_are_time_ordered() {
        let first = RecordingSessionId::new();
        let second = RecordingSessionId::new();
        // UUIDv7 sorts lexicographically by creation time.
        assert!(first.to_string() <= second.to_string());
    }
}
