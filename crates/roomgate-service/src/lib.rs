//! Roomgate Service Library
//!
//! Roomgate sits between a multi-party room host and a policy backend. It
//! integrates the host's room lifecycle with the backend over signed
//! webhooks:
//!
//! - Lifecycle notifications (created, joined, left, destroyed, recording)
//! - Synchronous pre-join access validation with a configurable fail policy
//! - Apply-once room configuration delivered by the backend
//! - One-shot duration timer that destroys rooms at their limit
//! - Recording upload-descriptor handoff for the external finalize step
//!
//! # Architecture
//!
//! The host talks to Roomgate over the hook API; Roomgate talks to the
//! backend over signed webhooks:
//!
//! ```text
//! routes/mod.rs -> handlers/*.rs -> rooms (actors) -> webhook/*.rs
//! ```
//!
//! All mutable room state lives in per-room actors supervised by a
//! registry actor.
//!
//! # Modules
//!
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - Hook API request handlers
//! - `recording` - Upload descriptor provisioning
//! - `rooms` - Registry and room actors
//! - `routes` - Axum router setup
//! - `validator` - Synchronous pre-join access validation
//! - `webhook` - Signed webhook protocol to the backend

pub mod config;
pub mod errors;
pub mod handlers;
pub mod recording;
pub mod rooms;
pub mod routes;
pub mod validator;
pub mod webhook;
