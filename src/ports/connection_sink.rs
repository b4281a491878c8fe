//! ConnectionSink port - The write half of one live transport session.
//!
//! The fanout layer never touches sockets directly. Each registered
//! connection carries a sink; the WebSocket adapter backs it with a bounded
//! queue drained by a per-connection writer task, tests back it with plain
//! channels.
//!
//! ## Contract
//!
//! - `send` must not block or await. A stalled recipient must never delay
//!   delivery to the others.
//! - A failed `send` is a per-recipient outcome, not an error of the caller.

use std::sync::Arc;

use thiserror::Error;

/// An encoded outbound frame, shared between all recipients of one fanout.
pub type OutboundFrame = Arc<str>;

/// Why a single send attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SendError {
    /// The transport is closed or closing.
    #[error("connection is closed")]
    Closed,

    /// The per-connection outbound queue is full.
    #[error("outbound queue is full")]
    Full,
}

/// Port for writing frames to one connection.
pub trait ConnectionSink: Send + Sync {
    /// Whether the transport can currently accept frames.
    ///
    /// A `false` here lets the dispatcher skip a half-closed connection
    /// without counting it as a failure.
    fn is_writable(&self) -> bool;

    /// Queue a frame for delivery without waiting for it to be written.
    fn send(&self, frame: OutboundFrame) -> Result<(), SendError>;
}
