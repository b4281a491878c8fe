//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the real-time core and the outside world. Adapters implement these ports.
//!
//! - `ConnectionSink` - Non-blocking write half of one transport session
//! - `RealtimeObserver` - Sink for recoverable failures (dropped frames, refused writes)
//! - `MessageFanout` - Entry point for the REST layer to broadcast persisted messages

mod connection_sink;
mod message_fanout;
mod realtime_observer;

pub use connection_sink::{ConnectionSink, OutboundFrame, SendError};
pub use message_fanout::{FanoutReport, MessageFanout};
pub use realtime_observer::{NoopObserver, RealtimeObserver};
