//! `RoomActor` - per-room actor that owns all mutable room state.
//!
//! Each `RoomActor` owns one room's configuration snapshot, applied flag,
//! participant roster, duration-timer handle, and recording session. The
//! mailbox serializes the room's event stream, so the apply-once guard and
//! the timer-armed flag are plain fields with no further synchronization:
//! the actor is the single writer.
//!
//! The validator's backend call runs inside message handling, which is
//! deliberate: it suspends this room's event stream until the decision
//! resolves (the pre-join contract) while other rooms keep processing.

use super::messages::{RoomMessage, RoomStateView};
use super::registry::RegistryHandle;
use crate::errors::RoomgateError;
use crate::recording::RecordingPipeline;
use crate::validator::{AccessDecision, AccessValidator, PreJoinRequest};
use crate::webhook::payloads::{
    unix_timestamp_millis, ModeratorChangedEvent, RecordingStatus, RecordingStatusEvent,
    RoomDestroyedEvent, UserJoinedEvent, UserLeftEvent,
};
use crate::webhook::{ConfigurationSnapshot, EventKind, WebhookDispatcher};
use common::types::{RecordingSessionId, RoomName};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Channel buffer size for a room mailbox.
const ROOM_CHANNEL_BUFFER: usize = 64;

/// Destruction reason used when the duration timer fires.
pub const DURATION_LIMIT_REASON: &str = "duration limit reached";

/// Handle to a `RoomActor`.
#[derive(Clone)]
pub struct RoomActorHandle {
    sender: mpsc::Sender<RoomMessage>,
    cancel_token: CancellationToken,
    room_name: RoomName,
}

impl std::fmt::Debug for RoomActorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomActorHandle")
            .field("room_name", &self.room_name)
            .finish_non_exhaustive()
    }
}

impl RoomActorHandle {
    /// The room name.
    #[must_use]
    pub fn room_name(&self) -> &RoomName {
        &self.room_name
    }

    /// Request an admission decision for one join attempt.
    ///
    /// Blocks until the room actor resolves the decision (including its
    /// backend call), or errors if the room is gone.
    pub async fn pre_join(&self, request: PreJoinRequest) -> Result<AccessDecision, RoomgateError> {
        let (tx, rx) = oneshot::channel();
        self.send(RoomMessage::PreJoin {
            request,
            respond_to: tx,
        })
        .await?;
        rx.await
            .map_err(|_| RoomgateError::RoomNotFound(self.room_name.to_string()))
    }

    /// Hand a configuration snapshot to the room's apply-once cache.
    pub async fn apply_configuration(
        &self,
        snapshot: ConfigurationSnapshot,
    ) -> Result<(), RoomgateError> {
        self.send(RoomMessage::ApplyConfiguration { snapshot }).await
    }

    /// Report an admitted participant entering the room.
    pub async fn occupant_joined(
        &self,
        user_jid: String,
        user_name: String,
        is_moderator: bool,
    ) -> Result<(), RoomgateError> {
        self.send(RoomMessage::OccupantJoined {
            user_jid,
            user_name,
            is_moderator,
        })
        .await
    }

    /// Report a participant leaving the room.
    pub async fn occupant_left(&self, user_jid: String) -> Result<(), RoomgateError> {
        self.send(RoomMessage::OccupantLeft { user_jid }).await
    }

    /// Report a moderator affiliation change.
    pub async fn affiliation_changed(
        &self,
        user_jid: String,
        is_moderator: bool,
    ) -> Result<(), RoomgateError> {
        self.send(RoomMessage::AffiliationChanged {
            user_jid,
            is_moderator,
        })
        .await
    }

    /// Report a recording state change. Returns the session id the status
    /// was attributed to.
    pub async fn recording_status(
        &self,
        status: RecordingStatus,
        session_id: Option<RecordingSessionId>,
    ) -> Result<Option<RecordingSessionId>, RoomgateError> {
        let (tx, rx) = oneshot::channel();
        self.send(RoomMessage::RecordingStatus {
            status,
            session_id,
            respond_to: tx,
        })
        .await?;
        rx.await
            .map_err(|_| RoomgateError::RoomNotFound(self.room_name.to_string()))
    }

    /// Read the room's effective settings.
    pub async fn get_state(&self) -> Result<RoomStateView, RoomgateError> {
        let (tx, rx) = oneshot::channel();
        self.send(RoomMessage::GetState { respond_to: tx }).await?;
        rx.await
            .map_err(|_| RoomgateError::RoomNotFound(self.room_name.to_string()))
    }

    /// Destroy the room. Resolves once the actor has fired the
    /// room-destroyed notification and is exiting.
    pub async fn destroy(&self, reason: String) -> Result<(), RoomgateError> {
        let (tx, rx) = oneshot::channel();
        self.send(RoomMessage::Destroy {
            reason,
            respond_to: tx,
        })
        .await?;
        rx.await
            .map_err(|_| RoomgateError::RoomNotFound(self.room_name.to_string()))
    }

    /// Cancel the room actor without the destroy protocol (shutdown path).
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    async fn send(&self, message: RoomMessage) -> Result<(), RoomgateError> {
        self.sender
            .send(message)
            .await
            .map_err(|_| RoomgateError::RoomNotFound(self.room_name.to_string()))
    }
}

/// Roster entry for a present participant.
#[derive(Debug)]
struct Participant {
    user_name: String,
    is_moderator: bool,
}

/// A recording session open on this room.
#[derive(Debug, Clone, Copy)]
struct RecordingSession {
    session_id: RecordingSessionId,
}

/// The `RoomActor` implementation.
pub struct RoomActor {
    room_name: RoomName,
    receiver: mpsc::Receiver<RoomMessage>,
    /// Child of the registry's token; cancelling it stops the actor and
    /// any armed duration timer.
    cancel_token: CancellationToken,
    /// Back-reference for the duration timer's destroy path.
    registry: RegistryHandle,
    dispatcher: WebhookDispatcher,
    validator: AccessValidator,
    recording: RecordingPipeline,
    /// Applied configuration; immutable once set.
    snapshot: Option<ConfigurationSnapshot>,
    /// Apply-once guard. Only this actor writes it.
    configured: bool,
    /// Privacy flag; rooms start public until configured otherwise.
    is_public: bool,
    participants: HashMap<String, Participant>,
    recording_session: Option<RecordingSession>,
    /// Cancellation token of the armed duration timer, if any.
    timer_token: Option<CancellationToken>,
}

impl RoomActor {
    /// Spawn a room actor. Returns its handle and the task join handle.
    pub fn spawn(
        room_name: RoomName,
        cancel_token: CancellationToken,
        registry: RegistryHandle,
        dispatcher: WebhookDispatcher,
        validator: AccessValidator,
        recording: RecordingPipeline,
    ) -> (RoomActorHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(ROOM_CHANNEL_BUFFER);

        let actor = Self {
            room_name: room_name.clone(),
            receiver,
            cancel_token: cancel_token.clone(),
            registry,
            dispatcher,
            validator,
            recording,
            snapshot: None,
            configured: false,
            is_public: true,
            participants: HashMap::new(),
            recording_session: None,
            timer_token: None,
        };

        let task_handle = tokio::spawn(actor.run());

        let handle = RoomActorHandle {
            sender,
            cancel_token,
            room_name,
        };

        (handle, task_handle)
    }

    /// Run the actor message loop.
    #[instrument(skip_all, name = "roomgate.actor.room", fields(room = %self.room_name))]
    async fn run(mut self) {
        debug!(target: "roomgate.actor.room", room = %self.room_name, "RoomActor started");

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    debug!(
                        target: "roomgate.actor.room",
                        room = %self.room_name,
                        "RoomActor cancelled"
                    );
                    break;
                }
                message = self.receiver.recv() => {
                    match message {
                        Some(RoomMessage::Destroy { reason, respond_to }) => {
                            self.handle_destroy(reason, respond_to);
                            break;
                        }
                        Some(message) => self.handle_message(message).await,
                        None => break,
                    }
                }
            }
        }

        debug!(target: "roomgate.actor.room", room = %self.room_name, "RoomActor stopped");
    }

    async fn handle_message(&mut self, message: RoomMessage) {
        match message {
            RoomMessage::PreJoin {
                request,
                respond_to,
            } => {
                let decision = self.handle_pre_join(&request).await;
                if respond_to.send(decision).is_err() {
                    warn!(
                        target: "roomgate.actor.room",
                        room = %self.room_name,
                        user = %request.user_jid,
                        "Pre-join caller went away before the decision resolved"
                    );
                }
            }
            RoomMessage::ApplyConfiguration { snapshot } => {
                self.apply_configuration(snapshot);
            }
            RoomMessage::OccupantJoined {
                user_jid,
                user_name,
                is_moderator,
            } => self.handle_occupant_joined(user_jid, user_name, is_moderator),
            RoomMessage::OccupantLeft { user_jid } => self.handle_occupant_left(&user_jid),
            RoomMessage::AffiliationChanged {
                user_jid,
                is_moderator,
            } => self.handle_affiliation_changed(user_jid, is_moderator),
            RoomMessage::RecordingStatus {
                status,
                session_id,
                respond_to,
            } => {
                let attributed = self.handle_recording_status(status, session_id).await;
                let _ = respond_to.send(attributed);
            }
            RoomMessage::GetState { respond_to } => {
                let _ = respond_to.send(self.state_view());
            }
            // Destroy is intercepted in `run`
            RoomMessage::Destroy { reason, respond_to } => {
                self.handle_destroy(reason, respond_to);
            }
        }
    }

    /// Resolve one join attempt.
    ///
    /// The backend call blocks this room's event stream only; the decision
    /// is returned through the pre-join oneshot.
    async fn handle_pre_join(&mut self, request: &PreJoinRequest) -> AccessDecision {
        // Short-circuit: a room known to be private cannot admit an
        // anonymous participant, so skip the backend round trip.
        if self.configured && !self.is_public && request.bearer_token().is_none() {
            debug!(
                target: "roomgate.actor.room",
                room = %self.room_name,
                user = %request.user_jid,
                "Private room, no credential: denying without backend call"
            );
            return AccessDecision::auth_required(None);
        }

        let meeting_id = self
            .snapshot
            .as_ref()
            .and_then(|snapshot| snapshot.meeting_id.clone());
        let outcome = self
            .validator
            .validate(&self.room_name, meeting_id.as_ref(), request)
            .await;

        if let Some(snapshot) = outcome.configuration {
            self.apply_configuration(snapshot);
        }

        outcome.decision
    }

    /// Apply a configuration snapshot at most once.
    ///
    /// Second and later calls are a logged no-op; concurrent first-joiners
    /// cannot race this because the mailbox serializes them.
    fn apply_configuration(&mut self, snapshot: ConfigurationSnapshot) {
        if self.configured {
            debug!(
                target: "roomgate.actor.room",
                room = %self.room_name,
                "Configuration already applied, ignoring"
            );
            return;
        }
        self.configured = true;

        self.is_public = snapshot.is_public;
        for user_jid in &snapshot.moderators {
            if let Some(participant) = self.participants.get_mut(user_jid) {
                participant.is_moderator = true;
            }
        }

        if let Some(minutes) = snapshot.max_duration_minutes {
            if minutes > 0 {
                self.arm_duration_timer(minutes);
            }
        }

        info!(
            target: "roomgate.actor.room",
            room = %self.room_name,
            is_public = snapshot.is_public,
            moderators = snapshot.moderators.len(),
            max_duration_minutes = ?snapshot.max_duration_minutes,
            subject = ?snapshot.subject,
            "Configuration applied"
        );

        self.snapshot = Some(snapshot);
    }

    /// Arm the one-shot duration timer.
    ///
    /// Destruction goes through the registry so it takes the same path as
    /// host-initiated destruction and fires exactly one room-destroyed
    /// notification. The timer races the room's cancellation token: a room
    /// destroyed early never sees its timer fire.
    fn arm_duration_timer(&mut self, minutes: u64) {
        if self.timer_token.is_some() {
            // One timer per room; guarded by the apply-once flag as well
            warn!(
                target: "roomgate.actor.room",
                room = %self.room_name,
                "Duration timer already armed, ignoring"
            );
            return;
        }

        let token = self.cancel_token.child_token();
        self.timer_token = Some(token.clone());

        let registry = self.registry.clone();
        let room_name = self.room_name.clone();
        info!(
            target: "roomgate.actor.room",
            room = %room_name,
            minutes,
            "Duration timer armed"
        );

        tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => {
                    debug!(
                        target: "roomgate.actor.room",
                        room = %room_name,
                        "Duration timer cancelled"
                    );
                }
                () = tokio::time::sleep(Duration::from_secs(minutes * 60)) => {
                    info!(
                        target: "roomgate.actor.room",
                        room = %room_name,
                        "Duration limit reached, destroying room"
                    );
                    let destroyed = registry
                        .destroy_room(room_name.clone(), DURATION_LIMIT_REASON.to_string())
                        .await;
                    if !destroyed {
                        debug!(
                            target: "roomgate.actor.room",
                            room = %room_name,
                            "Room already gone when duration timer fired"
                        );
                    }
                }
            }
        });
    }

    fn handle_occupant_joined(&mut self, user_jid: String, user_name: String, is_moderator: bool) {
        let is_moderator = is_moderator
            || self
                .snapshot
                .as_ref()
                .is_some_and(|snapshot| snapshot.moderators.contains(&user_jid));

        self.participants.insert(
            user_jid.clone(),
            Participant {
                user_name: user_name.clone(),
                is_moderator,
            },
        );

        self.dispatcher.notify(
            EventKind::UserJoined,
            UserJoinedEvent {
                room_name: self.room_name.clone(),
                user_jid,
                user_name,
                is_moderator,
                timestamp: unix_timestamp_millis(),
            },
        );
    }

    fn handle_occupant_left(&mut self, user_jid: &str) {
        if self.participants.remove(user_jid).is_none() {
            debug!(
                target: "roomgate.actor.room",
                room = %self.room_name,
                user = user_jid,
                "Leave event for unknown participant"
            );
        }

        self.dispatcher.notify(
            EventKind::UserLeft,
            UserLeftEvent {
                room_name: self.room_name.clone(),
                user_jid: user_jid.to_string(),
                timestamp: unix_timestamp_millis(),
            },
        );
    }

    fn handle_affiliation_changed(&mut self, user_jid: String, is_moderator: bool) {
        if let Some(participant) = self.participants.get_mut(&user_jid) {
            participant.is_moderator = is_moderator;
        }

        self.dispatcher.notify(
            EventKind::ModeratorChanged,
            ModeratorChangedEvent {
                room_name: self.room_name.clone(),
                user_jid,
                is_moderator,
                timestamp: unix_timestamp_millis(),
            },
        );
    }

    /// Recording state transition.
    ///
    /// Start provisions an upload descriptor for the external finalize
    /// step; stop/failed forwards the status and deletes the descriptor.
    /// The backend notification fires in every case, including descriptor
    /// provisioning failures.
    async fn handle_recording_status(
        &mut self,
        status: RecordingStatus,
        session_id: Option<RecordingSessionId>,
    ) -> Option<RecordingSessionId> {
        let meeting_id = self
            .snapshot
            .as_ref()
            .and_then(|snapshot| snapshot.meeting_id.clone());

        let attributed = match status {
            RecordingStatus::Started => {
                if let Some(session) = self.recording_session {
                    warn!(
                        target: "roomgate.actor.room",
                        room = %self.room_name,
                        session_id = %session.session_id,
                        "Recording already active, ignoring duplicate start"
                    );
                    return Some(session.session_id);
                }

                let session_id = session_id.unwrap_or_default();
                self.recording_session = Some(RecordingSession { session_id });

                if let Err(e) = self
                    .recording
                    .provision(&self.room_name, meeting_id.as_ref(), session_id)
                    .await
                {
                    error!(
                        target: "roomgate.actor.room",
                        room = %self.room_name,
                        session_id = %session_id,
                        error = %e,
                        "Recording descriptor provisioning failed"
                    );
                }
                Some(session_id)
            }
            RecordingStatus::Stopped | RecordingStatus::Failed => {
                let attributed =
                    session_id.or(self.recording_session.map(|session| session.session_id));
                self.recording_session = None;

                if let Some(session_id) = attributed {
                    if let Err(e) = self.recording.discard(session_id).await {
                        warn!(
                            target: "roomgate.actor.room",
                            room = %self.room_name,
                            session_id = %session_id,
                            error = %e,
                            "Failed to remove upload descriptor"
                        );
                    }
                }
                attributed
            }
        };

        self.dispatcher.notify(
            EventKind::RecordingStatus,
            RecordingStatusEvent {
                room_name: self.room_name.clone(),
                meeting_id,
                session_id: attributed,
                status,
                timestamp: unix_timestamp_millis(),
            },
        );

        attributed
    }

    /// Terminal destroy path, shared by host-initiated destruction and the
    /// duration timer.
    fn handle_destroy(&mut self, reason: String, respond_to: oneshot::Sender<()>) {
        info!(
            target: "roomgate.actor.room",
            room = %self.room_name,
            reason = %reason,
            "Room destroyed"
        );

        // The timer must never fire on a destroyed room
        if let Some(token) = self.timer_token.take() {
            token.cancel();
        }

        self.dispatcher.notify(
            EventKind::RoomDestroyed,
            RoomDestroyedEvent {
                room_name: self.room_name.clone(),
                reason: Some(reason),
                timestamp: unix_timestamp_millis(),
            },
        );

        // An open recording session keeps its descriptor: the finalize
        // step still needs it to upload the artifact.

        let _ = respond_to.send(());
        self.cancel_token.cancel();
    }

    fn state_view(&self) -> RoomStateView {
        let snapshot = self.snapshot.as_ref();
        RoomStateView {
            room_name: self.room_name.clone(),
            is_public: self.is_public,
            configured: self.configured,
            meeting_id: snapshot.and_then(|s| s.meeting_id.clone()),
            max_duration_minutes: snapshot.and_then(|s| s.max_duration_minutes),
            subject: snapshot.and_then(|s| s.subject.clone()),
            history_length: snapshot.and_then(|s| s.history_length),
            moderators: snapshot.map(|s| s.moderators.clone()).unwrap_or_default(),
            features: snapshot.map(|s| s.features.clone()).unwrap_or_default(),
            participant_count: self.participants.len(),
            recording_active: self.recording_session.is_some(),
        }
    }
}
