//! HTTP handlers for the hook API.

pub mod health;
pub mod hooks;
pub mod rooms;

pub use health::health_check;
pub use hooks::{
    affiliation_changed, occupant_joined, occupant_left, pre_join, recording, room_created,
    room_destroyed,
};
pub use rooms::get_room_state;
