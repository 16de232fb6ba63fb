//! Shared types for the chatwire streaming chat pipeline.
//!
//! Everything here is plain data: the [`Message`] the UI renders, the
//! [`Delta`] decoded from each server event, the [`SessionStatus`] state
//! machine, and the error taxonomy. No I/O lives in this crate.

pub mod error;
pub mod types;

pub use error::*;
pub use types::*;
