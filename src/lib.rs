//! Team Chat real-time core
//!
//! This crate implements the presence and channel fanout layer of a team
//! chat application: it tracks live WebSocket connections, the user each
//! one asserted and the channels each one joined, and relays messages and
//! typing indicators to the other subscribers of a channel.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
