//! Room actor system.
//!
//! # Architecture
//!
//! - [`registry`] - singleton actor tracking rooms by name
//! - [`room`] - per-room actor owning all mutable room state
//! - [`messages`] - typed messages for both mailboxes
//!
//! One actor per room serializes that room's event stream; the registry
//! never waits on a room, so rooms cannot stall each other.

pub mod messages;
pub mod registry;
pub mod room;

pub use messages::{RegistryStatus, RoomStateView};
pub use registry::{RegistryHandle, RoomRegistry};
pub use room::{RoomActorHandle, DURATION_LIMIT_REASON};
