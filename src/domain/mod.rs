//! Domain layer containing the real-time vocabulary.
//!
//! # Module Organization
//!
//! - `foundation` - Identifiers, timestamps and the connection lifecycle state machine

pub mod foundation;
