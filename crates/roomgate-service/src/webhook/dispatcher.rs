//! Fire-and-forget lifecycle event dispatch.
//!
//! The dispatcher spawns every send so the triggering lifecycle event never
//! waits on the network. Each event occurrence gets exactly one send
//! attempt; delivery failures are logged and never touch room state.
//!
//! `room-created` is the one event whose response matters: the backend may
//! answer with a configuration snapshot. The caller (the room registry)
//! invokes [`WebhookDispatcher::send_room_created`] from its own spawned
//! task and forwards any snapshot to the room's apply-once path.

use super::payloads::{ConfigurationSnapshot, EventKind, RoomCreatedEvent};
use super::transport::WebhookClient;
use serde::Serialize;
use tracing::{debug, warn};

/// Asynchronous webhook event sender.
#[derive(Clone)]
pub struct WebhookDispatcher {
    client: WebhookClient,
}

impl WebhookDispatcher {
    #[must_use]
    pub fn new(client: WebhookClient) -> Self {
        Self { client }
    }

    /// Send a lifecycle event without blocking the caller.
    ///
    /// At-most-once attempt; failures are logged at `warn` and dropped.
    pub fn notify<T>(&self, kind: EventKind, payload: T)
    where
        T: Serialize + Send + Sync + 'static,
    {
        let client = self.client.clone();
        tokio::spawn(async move {
            match client.send(kind.path(), &payload).await {
                Ok(_) => {
                    debug!(
                        target: "roomgate.webhook.dispatcher",
                        event = kind.as_str(),
                        "Webhook delivered"
                    );
                }
                Err(e) => {
                    warn!(
                        target: "roomgate.webhook.dispatcher",
                        event = kind.as_str(),
                        error = %e,
                        "Webhook delivery failed"
                    );
                }
            }
        });
    }

    /// Send `room-created` and return the configuration snapshot from the
    /// response body, if the backend provided one.
    ///
    /// Delivery failures and unparseable bodies are logged and yield
    /// `None`; the room simply starts unconfigured and may still receive a
    /// snapshot through a later validation response.
    pub async fn send_room_created(
        &self,
        payload: &RoomCreatedEvent,
    ) -> Option<ConfigurationSnapshot> {
        let room_name = payload.room_name.clone();
        match self.client.send(EventKind::RoomCreated.path(), payload).await {
            Ok(body) if body.is_empty() => None,
            Ok(body) => match serde_json::from_slice::<ConfigurationSnapshot>(&body) {
                Ok(snapshot) => Some(snapshot),
                Err(e) => {
                    debug!(
                        target: "roomgate.webhook.dispatcher",
                        room = %room_name,
                        error = %e,
                        "room-created response carried no usable configuration"
                    );
                    None
                }
            },
            Err(e) => {
                warn!(
                    target: "roomgate.webhook.dispatcher",
                    room = %room_name,
                    error = %e,
                    "room-created webhook delivery failed"
                );
                None
            }
        }
    }
}
