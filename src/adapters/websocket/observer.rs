//! `tracing`-backed [`RealtimeObserver`].

use crate::domain::foundation::{ChannelId, ConnectionId};
use crate::ports::{RealtimeObserver, SendError};

/// Logs every recoverable real-time failure.
///
/// Closed recipients are routine during disconnect storms and log at
/// `debug`; everything else logs at `warn`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl RealtimeObserver for TracingObserver {
    fn frame_rejected(&self, connection: &ConnectionId, reason: &str) {
        tracing::warn!(connection_id = %connection, reason, "dropping inbound frame");
    }

    fn send_failed(&self, recipient: &ConnectionId, channel: &ChannelId, error: SendError) {
        match error {
            SendError::Closed => tracing::debug!(
                connection_id = %recipient,
                channel_id = %channel,
                "recipient closed during fanout"
            ),
            SendError::Full => tracing::warn!(
                connection_id = %recipient,
                channel_id = %channel,
                "recipient queue full, frame dropped"
            ),
        }
    }

    fn unidentified_broadcast(&self, connection: &ConnectionId, channel: &ChannelId, dropped: bool) {
        tracing::warn!(
            connection_id = %connection,
            channel_id = %channel,
            dropped,
            "broadcast from connection that never sent auth"
        );
    }

    fn registry_anomaly(&self, connection: &ConnectionId, detail: &str) {
        tracing::debug!(connection_id = %connection, detail, "registry anomaly");
    }
}
