//! `RoomRegistry` - singleton actor that supervises room actors.
//!
//! Owns the room-name to handle map. The registry only resolves names and
//! manages lifecycles; it never waits on an individual room, so one room's
//! blocking validation cannot stall another room's events.
//!
//! Cancellation hierarchy: registry token -> room token -> duration-timer
//! token. Cancelling the registry (shutdown) stops every room without the
//! destroy protocol; destroying a room cancels only that room's subtree.

use super::messages::{RegistryMessage, RegistryStatus};
use super::room::{RoomActor, RoomActorHandle};
use crate::errors::RoomgateError;
use crate::recording::RecordingPipeline;
use crate::validator::AccessValidator;
use crate::webhook::payloads::{unix_timestamp_millis, RoomCreatedEvent};
use crate::webhook::WebhookDispatcher;
use common::types::RoomName;
use std::collections::HashMap;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Channel buffer size for the registry mailbox.
const REGISTRY_CHANNEL_BUFFER: usize = 256;

/// Handle to the `RoomRegistry`.
#[derive(Clone)]
pub struct RegistryHandle {
    sender: mpsc::Sender<RegistryMessage>,
    cancel_token: CancellationToken,
}

impl RegistryHandle {
    /// Track a newly created room.
    ///
    /// Idempotent: creating an already-tracked room is a logged no-op.
    pub async fn create_room(&self, room_name: RoomName) -> Result<(), RoomgateError> {
        let (tx, rx) = oneshot::channel();
        self.send(RegistryMessage::CreateRoom {
            room_name,
            respond_to: tx,
        })
        .await?;
        rx.await
            .map_err(|_| RoomgateError::Internal("registry response dropped".to_string()))?
    }

    /// Resolve a room name to its actor handle.
    pub async fn room(&self, room_name: RoomName) -> Result<Option<RoomActorHandle>, RoomgateError> {
        let (tx, rx) = oneshot::channel();
        self.send(RegistryMessage::GetRoom {
            room_name,
            respond_to: tx,
        })
        .await?;
        rx.await
            .map_err(|_| RoomgateError::Internal("registry response dropped".to_string()))
    }

    /// Destroy a room. Returns `false` when the room is unknown, so late
    /// duration-timer fires and duplicate host events degrade to no-ops.
    pub async fn destroy_room(&self, room_name: RoomName, reason: String) -> bool {
        let (tx, rx) = oneshot::channel();
        let sent = self
            .send(RegistryMessage::DestroyRoom {
                room_name,
                reason,
                respond_to: tx,
            })
            .await
            .is_ok();
        if !sent {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    /// Registry occupancy, for health reporting.
    pub async fn status(&self) -> Result<RegistryStatus, RoomgateError> {
        let (tx, rx) = oneshot::channel();
        self.send(RegistryMessage::GetStatus { respond_to: tx })
            .await?;
        rx.await
            .map_err(|_| RoomgateError::Internal("registry response dropped".to_string()))
    }

    /// Graceful shutdown: cancel all rooms and stop the registry actor.
    pub async fn shutdown(&self) {
        let (tx, rx) = oneshot::channel();
        if self
            .send(RegistryMessage::Shutdown { respond_to: tx })
            .await
            .is_ok()
        {
            let _ = rx.await;
        }
        self.cancel_token.cancel();
    }

    async fn send(&self, message: RegistryMessage) -> Result<(), RoomgateError> {
        self.sender
            .send(message)
            .await
            .map_err(|_| RoomgateError::Internal("registry mailbox closed".to_string()))
    }
}

/// A supervised room.
struct ManagedRoom {
    handle: RoomActorHandle,
    task_handle: JoinHandle<()>,
}

/// The `RoomRegistry` implementation.
pub struct RoomRegistry {
    receiver: mpsc::Receiver<RegistryMessage>,
    cancel_token: CancellationToken,
    rooms: HashMap<RoomName, ManagedRoom>,
    dispatcher: WebhookDispatcher,
    validator: AccessValidator,
    recording: RecordingPipeline,
    /// Clone of our own handle, passed to rooms for the timer destroy path.
    self_handle: RegistryHandle,
}

impl RoomRegistry {
    /// Spawn the registry actor. Returns its handle and task join handle.
    pub fn spawn(
        dispatcher: WebhookDispatcher,
        validator: AccessValidator,
        recording: RecordingPipeline,
    ) -> (RegistryHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(REGISTRY_CHANNEL_BUFFER);
        let cancel_token = CancellationToken::new();

        let handle = RegistryHandle {
            sender,
            cancel_token: cancel_token.clone(),
        };

        let registry = Self {
            receiver,
            cancel_token,
            rooms: HashMap::new(),
            dispatcher,
            validator,
            recording,
            self_handle: handle.clone(),
        };

        let task_handle = tokio::spawn(registry.run());
        (handle, task_handle)
    }

    /// Run the registry message loop.
    #[instrument(skip_all, name = "roomgate.actor.registry")]
    async fn run(mut self) {
        info!(target: "roomgate.actor.registry", "RoomRegistry started");

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    info!(
                        target: "roomgate.actor.registry",
                        "RoomRegistry received cancellation signal"
                    );
                    break;
                }
                message = self.receiver.recv() => {
                    match message {
                        Some(message) => self.handle_message(message),
                        None => break,
                    }
                }
            }
        }

        // Cancel remaining rooms and wait for their actors to exit
        let rooms: Vec<ManagedRoom> = self.rooms.drain().map(|(_, room)| room).collect();
        for room in &rooms {
            room.handle.cancel();
        }
        for room in rooms {
            let _ = room.task_handle.await;
        }

        info!(target: "roomgate.actor.registry", "RoomRegistry stopped");
    }

    fn handle_message(&mut self, message: RegistryMessage) {
        match message {
            RegistryMessage::CreateRoom {
                room_name,
                respond_to,
            } => {
                let result = self.handle_create_room(room_name);
                let _ = respond_to.send(result);
            }
            RegistryMessage::GetRoom {
                room_name,
                respond_to,
            } => {
                let handle = self.rooms.get(&room_name).map(|room| room.handle.clone());
                let _ = respond_to.send(handle);
            }
            RegistryMessage::DestroyRoom {
                room_name,
                reason,
                respond_to,
            } => {
                let destroyed = self.handle_destroy_room(&room_name, reason);
                let _ = respond_to.send(destroyed);
            }
            RegistryMessage::GetStatus { respond_to } => {
                let _ = respond_to.send(RegistryStatus {
                    active_rooms: self.rooms.len(),
                });
            }
            RegistryMessage::Shutdown { respond_to } => {
                self.cancel_token.cancel();
                let _ = respond_to.send(());
            }
        }
    }

    /// Track a new room and fire the room-created webhook.
    ///
    /// The webhook runs in its own task; its response may carry a
    /// configuration snapshot, which is forwarded to the room's apply-once
    /// path and may race (safely) with a join-embedded snapshot.
    fn handle_create_room(&mut self, room_name: RoomName) -> Result<(), RoomgateError> {
        if self.rooms.contains_key(&room_name) {
            warn!(
                target: "roomgate.actor.registry",
                room = %room_name,
                "Room already tracked, ignoring duplicate create"
            );
            return Ok(());
        }

        let (handle, task_handle) = RoomActor::spawn(
            room_name.clone(),
            self.cancel_token.child_token(),
            self.self_handle.clone(),
            self.dispatcher.clone(),
            self.validator.clone(),
            self.recording.clone(),
        );

        info!(
            target: "roomgate.actor.registry",
            room = %room_name,
            active_rooms = self.rooms.len() + 1,
            "Room created"
        );

        let dispatcher = self.dispatcher.clone();
        let room_handle = handle.clone();
        let payload = RoomCreatedEvent {
            room_name: room_name.clone(),
            timestamp: unix_timestamp_millis(),
        };
        tokio::spawn(async move {
            if let Some(snapshot) = dispatcher.send_room_created(&payload).await {
                if let Err(e) = room_handle.apply_configuration(snapshot).await {
                    debug!(
                        target: "roomgate.actor.registry",
                        room = %room_handle.room_name(),
                        error = %e,
                        "Room gone before room-created configuration arrived"
                    );
                }
            }
        });

        self.rooms.insert(room_name, ManagedRoom { handle, task_handle });
        Ok(())
    }

    /// Remove a room and run its destroy protocol.
    fn handle_destroy_room(&mut self, room_name: &RoomName, reason: String) -> bool {
        let Some(room) = self.rooms.remove(room_name) else {
            debug!(
                target: "roomgate.actor.registry",
                room = %room_name,
                "Destroy for unknown room is a no-op"
            );
            return false;
        };

        info!(
            target: "roomgate.actor.registry",
            room = %room_name,
            reason = %reason,
            active_rooms = self.rooms.len(),
            "Destroying room"
        );

        // Run the destroy protocol off the registry loop so a busy room
        // cannot stall other rooms' events.
        tokio::spawn(async move {
            if let Err(e) = room.handle.destroy(reason).await {
                debug!(
                    target: "roomgate.actor.registry",
                    room = %room.handle.room_name(),
                    error = %e,
                    "Room exited before the destroy protocol completed"
                );
            }
            let _ = room.task_handle.await;
        });

        true
    }
}
