//! Secret types for protecting sensitive values from accidental logging.
//!
//! Re-exports from the [`secrecy`] crate. Webhook shared secrets and legacy
//! auth tokens must be stored as [`SecretString`] so that any struct deriving
//! `Debug` redacts them automatically, and the memory is zeroized on drop.
//!
//! To read the actual value, callers must explicitly use
//! [`ExposeSecret::expose_secret`], which keeps every access greppable.

pub use secrecy::{ExposeSecret, SecretBox, SecretString};
