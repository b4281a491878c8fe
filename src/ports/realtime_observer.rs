//! RealtimeObserver port - Where non-fatal real-time failures are reported.
//!
//! Nothing in the fanout path is allowed to fail the connection or the
//! process. Instead, every dropped frame, refused write and suspicious
//! event is handed to an observer. The production adapter logs through
//! `tracing`; tests record the calls.

use crate::domain::foundation::{ChannelId, ConnectionId};

use super::connection_sink::SendError;

/// Port for observing recoverable real-time failures.
///
/// All methods have empty default bodies so adapters only implement the
/// notifications they care about.
pub trait RealtimeObserver: Send + Sync {
    /// An inbound frame could not be decoded and was dropped.
    fn frame_rejected(&self, _connection: &ConnectionId, _reason: &str) {}

    /// A write to a fanout recipient failed.
    fn send_failed(&self, _recipient: &ConnectionId, _channel: &ChannelId, _error: SendError) {}

    /// A `new_message` or `typing` event came from a connection that never
    /// sent `auth`. `dropped` tells whether the event was discarded.
    fn unidentified_broadcast(
        &self,
        _connection: &ConnectionId,
        _channel: &ChannelId,
        _dropped: bool,
    ) {
    }

    /// A registry operation referenced a handle in an unexpected state
    /// (duplicate register, event after unregister).
    fn registry_anomaly(&self, _connection: &ConnectionId, _detail: &str) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl RealtimeObserver for NoopObserver {}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn RealtimeObserver) {}

    #[test]
    fn noop_observer_accepts_every_notification() {
        let observer = NoopObserver;
        let id = ConnectionId::new();
        let channel = ChannelId::new(1);

        observer.frame_rejected(&id, "bad json");
        observer.send_failed(&id, &channel, SendError::Closed);
        observer.unidentified_broadcast(&id, &channel, false);
        observer.registry_anomaly(&id, "duplicate");
    }
}
