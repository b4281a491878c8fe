//! Queue-backed [`ConnectionSink`] used by the WebSocket handler.
//!
//! Each connection owns a bounded mpsc queue. The dispatcher pushes encoded
//! frames with `try_send`; a writer task drains the queue into the socket.
//! A slow socket therefore fills its own queue and nothing else.

use tokio::sync::mpsc::{self, error::TrySendError};

use crate::ports::{ConnectionSink, OutboundFrame, SendError};

/// Write half of a connection backed by a bounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<OutboundFrame>,
}

impl ChannelSink {
    /// Create a sink and the receiver its writer task should drain.
    ///
    /// A zero capacity is raised to one.
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<OutboundFrame>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl ConnectionSink for ChannelSink {
    fn is_writable(&self) -> bool {
        !self.tx.is_closed()
    }

    fn send(&self, frame: OutboundFrame) -> Result<(), SendError> {
        self.tx.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => SendError::Full,
            TrySendError::Closed(_) => SendError::Closed,
        })
    }
}
