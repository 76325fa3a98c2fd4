//! Shared primitives for Roomgate components.

#![warn(clippy::pedantic)]

/// Module for identifier newtypes shared across components
pub mod types;

/// Module for secret types that prevent accidental logging
pub mod secret;
