//! Foundation module - Shared domain primitives.
//!
//! Contains the identifiers, timestamps and lifecycle states that form the
//! vocabulary of the real-time layer.

mod connection_state;
mod ids;
mod state_machine;
mod timestamp;

pub use connection_state::ConnectionState;
pub use ids::{ChannelId, ConnectionId, UserId};
pub use state_machine::{InvalidTransition, StateMachine};
pub use timestamp::Timestamp;
