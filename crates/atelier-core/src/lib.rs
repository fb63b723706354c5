//! Core domain model for Atelier.
//!
//! Holds the template registry, the composer state machine, the
//! conversation store, and the request builder. Everything here is pure
//! and transport-agnostic; the HTTP side lives in `atelier-interaction`.

pub mod composer;
pub mod conversation;
pub mod error;
pub mod message;
pub mod request;
pub mod template;

// Re-export common error type
pub use error::{AtelierError, Result};
