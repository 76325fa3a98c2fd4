//! Backend webhook protocol: payloads, signed transport, and dispatch.
//!
//! # Modules
//!
//! - [`payloads`] - per-endpoint request/response types
//! - [`transport`] - HMAC signing and bounded-timeout HTTP calls
//! - [`dispatcher`] - fire-and-forget lifecycle event sends

pub mod dispatcher;
pub mod payloads;
pub mod transport;

pub use dispatcher::WebhookDispatcher;
pub use payloads::{ConfigurationSnapshot, EventKind, RecordingStatus};
pub use transport::{WebhookClient, WebhookError};
