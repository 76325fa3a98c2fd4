//! Synchronous pre-join access validation.
//!
//! Every pre-join attempt gets exactly one backend call (no retries); the
//! join decision blocks until the call resolves or its bounded timeout
//! elapses. Backend failures never leave the decision unresolved: the
//! configured [`FailPolicy`] converts them into an explicit allow or deny
//! in a single place, `decide_on_failure`, so the policy cannot diverge
//! across code paths.
//!
//! The private-room short-circuit lives in the room actor, which owns the
//! privacy flag; by the time `validate` runs, a backend round trip is
//! required.

use crate::config::FailPolicy;
use crate::webhook::payloads::{
    unix_timestamp_millis, ValidateAccessRequest, ValidateAccessResponse, VALIDATE_ACCESS_PATH,
};
use crate::webhook::{ConfigurationSnapshot, WebhookClient, WebhookError};
use common::types::{MeetingId, RoomName};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Pre-join context delivered by the host.
///
/// Carries the candidate credential locations. Extraction order is fixed:
/// session-stored token, custom stanza element, URL-derived token.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreJoinRequest {
    /// Bare participant address.
    pub user_jid: String,

    /// Display name.
    #[serde(default)]
    pub user_name: String,

    /// Token stored on the host session, if any.
    #[serde(default)]
    pub session_token: Option<String>,

    /// Token carried in a custom presence stanza element, if any.
    #[serde(default)]
    pub stanza_token: Option<String>,

    /// Token derived from the join URL, if any.
    #[serde(default)]
    pub url_token: Option<String>,
}

impl PreJoinRequest {
    /// Ordered credential fallback; first non-empty location wins.
    #[must_use]
    pub fn bearer_token(&self) -> Option<&str> {
        [&self.session_token, &self.stanza_token, &self.url_token]
            .into_iter()
            .filter_map(|token| token.as_deref())
            .find(|token| !token.is_empty())
    }
}

/// Reason code attached to every access decision.
///
/// Distinct reasons let the client present the correct message instead of
/// a generic "forbidden".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    /// Admitted.
    Ok,
    /// Private room, no credential presented.
    AuthRequired,
    /// Credential did not match an invitation.
    NotInvited,
    /// No meeting exists for this room.
    MeetingNotFound,
    /// The meeting's scheduled window has passed.
    MeetingExpired,
    /// The meeting was cancelled by its organizer.
    MeetingCancelled,
    /// Backend call timed out under fail-closed.
    ServiceTimeout,
    /// Backend unreachable or answered garbage under fail-closed.
    ServiceError,
    /// Backend denied without a recognized reason.
    Denied,
}

impl DecisionReason {
    /// Map a backend reason string, falling back to the generic denial.
    #[must_use]
    pub fn parse(reason: &str) -> Self {
        match reason {
            "ok" => DecisionReason::Ok,
            "auth_required" => DecisionReason::AuthRequired,
            "not_invited" => DecisionReason::NotInvited,
            "meeting_not_found" => DecisionReason::MeetingNotFound,
            "meeting_expired" => DecisionReason::MeetingExpired,
            "meeting_cancelled" => DecisionReason::MeetingCancelled,
            other => {
                debug!(
                    target: "roomgate.validator",
                    reason = other,
                    "Unrecognized backend reason, treating as generic denial"
                );
                DecisionReason::Denied
            }
        }
    }
}

/// Final outcome of one join attempt. Consumed once, never persisted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessDecision {
    pub allowed: bool,
    pub reason: DecisionReason,
    pub require_auth: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
}

impl AccessDecision {
    /// An allow decision.
    #[must_use]
    pub fn allowed() -> Self {
        Self {
            allowed: true,
            reason: DecisionReason::Ok,
            require_auth: false,
            redirect_url: None,
        }
    }

    /// A deny decision with the given reason.
    #[must_use]
    pub fn denied(reason: DecisionReason) -> Self {
        Self {
            allowed: false,
            reason,
            require_auth: false,
            redirect_url: None,
        }
    }

    /// Deny for a private room with no credential, pointing the client at
    /// a login flow when one is known.
    #[must_use]
    pub fn auth_required(redirect_url: Option<String>) -> Self {
        Self {
            allowed: false,
            reason: DecisionReason::AuthRequired,
            require_auth: true,
            redirect_url,
        }
    }
}

/// Result of a validation call: the decision plus any configuration
/// snapshot the backend embedded in its response.
#[derive(Debug)]
pub struct ValidationOutcome {
    pub decision: AccessDecision,
    pub configuration: Option<ConfigurationSnapshot>,
}

/// The synchronous pre-join gate.
#[derive(Clone)]
pub struct AccessValidator {
    client: WebhookClient,
    policy: FailPolicy,
}

impl AccessValidator {
    #[must_use]
    pub fn new(client: WebhookClient, policy: FailPolicy) -> Self {
        Self { client, policy }
    }

    /// The configured fail policy.
    #[must_use]
    pub fn policy(&self) -> FailPolicy {
        self.policy
    }

    /// Consult the backend for one join attempt.
    ///
    /// Blocks the caller until the backend answers or the per-call timeout
    /// elapses; exactly one attempt is made.
    pub async fn validate(
        &self,
        room_name: &RoomName,
        meeting_id: Option<&MeetingId>,
        request: &PreJoinRequest,
    ) -> ValidationOutcome {
        let payload = ValidateAccessRequest {
            room_name: room_name.clone(),
            meeting_id: meeting_id.cloned(),
            user_jid: request.user_jid.clone(),
            user_name: request.user_name.clone(),
            bearer_token: request.bearer_token().map(ToOwned::to_owned),
            timestamp: unix_timestamp_millis(),
        };

        match self
            .client
            .send_json::<_, ValidateAccessResponse>(VALIDATE_ACCESS_PATH, &payload)
            .await
        {
            Ok(response) => Self::outcome_from_response(room_name, request, response),
            Err(error) => self.decide_on_failure(room_name, request, &error),
        }
    }

    fn outcome_from_response(
        room_name: &RoomName,
        request: &PreJoinRequest,
        response: ValidateAccessResponse,
    ) -> ValidationOutcome {
        let decision = if response.allowed {
            AccessDecision::allowed()
        } else {
            let reason = response
                .reason
                .as_deref()
                .map_or(DecisionReason::Denied, DecisionReason::parse);
            AccessDecision {
                allowed: false,
                reason,
                require_auth: response.require_auth,
                redirect_url: response.redirect_url.clone(),
            }
        };

        debug!(
            target: "roomgate.validator",
            room = %room_name,
            user = %request.user_jid,
            allowed = decision.allowed,
            reason = ?decision.reason,
            "Validation resolved"
        );

        ValidationOutcome {
            decision,
            configuration: response.configuration,
        }
    }

    /// The single place the fail policy is applied.
    fn decide_on_failure(
        &self,
        room_name: &RoomName,
        request: &PreJoinRequest,
        error: &WebhookError,
    ) -> ValidationOutcome {
        let reason = if error.is_timeout() {
            DecisionReason::ServiceTimeout
        } else {
            DecisionReason::ServiceError
        };

        let decision = match self.policy {
            FailPolicy::FailClosed => {
                warn!(
                    target: "roomgate.validator",
                    room = %room_name,
                    user = %request.user_jid,
                    error = %error,
                    "Backend unavailable, denying join (fail-closed)"
                );
                AccessDecision::denied(reason)
            }
            FailPolicy::FailOpen => {
                warn!(
                    target: "roomgate.validator",
                    room = %room_name,
                    user = %request.user_jid,
                    error = %error,
                    "Backend unavailable, admitting join (fail-open)"
                );
                AccessDecision::allowed()
            }
        };

        ValidationOutcome {
            decision,
            configuration: None,
        }
    }
}
