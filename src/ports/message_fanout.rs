//! MessageFanout port - Hand-off from the REST layer into real-time fanout.
//!
//! After the REST "create message" handler has persisted a message it
//! originates a `new_message` broadcast through this port. Whether the call
//! is in-process or crosses a queue is the integrator's choice; the
//! dispatcher implements it in-process.

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::foundation::{ChannelId, ConnectionId};

/// Outcome of one fanout, counted per candidate recipient.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FanoutReport {
    /// Frames queued on a recipient's transport.
    pub delivered: usize,
    /// Recipients skipped because their transport was not writable.
    pub skipped: usize,
    /// Recipients whose transport refused the frame.
    pub failed: usize,
}

impl FanoutReport {
    /// Number of subscribers considered, excluding the sender.
    pub fn recipients(&self) -> usize {
        self.delivered + self.skipped + self.failed
    }
}

/// Port for broadcasting a persisted message to a channel's live subscribers.
#[async_trait]
pub trait MessageFanout: Send + Sync {
    /// Broadcast `payload` as a `new_message` frame to every subscriber of
    /// `channel`, except `origin` when given.
    async fn broadcast_message(
        &self,
        channel: ChannelId,
        payload: serde_json::Value,
        origin: Option<ConnectionId>,
    ) -> FanoutReport;
}
