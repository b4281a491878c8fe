//! Fanout dispatcher: inbound frames in, registry changes and fanout out.
//!
//! ```text
//! raw text ──decode──▶ InboundEvent
//!                         ├─ auth / join_channel / leave_channel ─▶ registry mutation
//!                         └─ new_message / typing ─▶ subscribers_of(channel)
//!                                                      └─ minus sender, minus unwritable
//!                                                         └─ sink.send(frame)
//! ```
//!
//! Nothing here fails a connection. Decode errors, refused writes and
//! registry anomalies are reported to the [`RealtimeObserver`] and the frame
//! is dropped.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{RealtimeConfig, UnidentifiedPolicy};
use crate::domain::foundation::{ChannelId, ConnectionId, ConnectionState, UserId};
use crate::ports::{FanoutReport, MessageFanout, RealtimeObserver};

use super::messages::{FrameCodec, InboundEvent, OutboundEvent, ProtocolError};
use super::registry::{ConnectionHandle, ConnectionRegistry, RegistryError, RemovedConnection};

/// What handling one inbound frame amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The frame could not be decoded and was dropped.
    Rejected,
    /// A registry mutation (`auth`, `join_channel`, `leave_channel`) was applied.
    Applied,
    /// The event was valid but had no effect (unknown connection, or an
    /// unidentified broadcaster under [`UnidentifiedPolicy::Drop`]).
    Ignored,
    /// The event was fanned out.
    Fanout(FanoutReport),
}

/// Decodes client events and routes them through the [`ConnectionRegistry`].
///
/// Safe to share across connection tasks; all shared state is inside the
/// registry.
pub struct FanoutDispatcher {
    registry: Arc<ConnectionRegistry>,
    observer: Arc<dyn RealtimeObserver>,
    codec: FrameCodec,
    unidentified_policy: UnidentifiedPolicy,
}

impl FanoutDispatcher {
    /// Create a dispatcher with default frame limit and [`UnidentifiedPolicy::Allow`].
    pub fn new(registry: Arc<ConnectionRegistry>, observer: Arc<dyn RealtimeObserver>) -> Self {
        Self {
            registry,
            observer,
            codec: FrameCodec::default(),
            unidentified_policy: UnidentifiedPolicy::default(),
        }
    }

    /// Create a dispatcher from the `realtime` configuration section.
    pub fn from_config(
        registry: Arc<ConnectionRegistry>,
        observer: Arc<dyn RealtimeObserver>,
        config: &RealtimeConfig,
    ) -> Self {
        Self::new(registry, observer)
            .with_codec(FrameCodec::new(config.max_frame_bytes))
            .with_unidentified_policy(config.unidentified_policy)
    }

    pub fn with_codec(mut self, codec: FrameCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_unidentified_policy(mut self, policy: UnidentifiedPolicy) -> Self {
        self.unidentified_policy = policy;
        self
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Register a freshly accepted connection.
    pub async fn on_open(&self, handle: ConnectionHandle) -> Result<(), RegistryError> {
        let id = handle.id();
        self.registry.register(handle).await.map_err(|e| {
            self.observer.registry_anomaly(&id, &e.to_string());
            e
        })
    }

    /// Decode and handle one inbound text frame.
    pub async fn on_frame(&self, id: &ConnectionId, raw: &str) -> FrameOutcome {
        match self.codec.decode(raw) {
            Ok(event) => self.handle_event(id, event).await,
            Err(e) => self.reject(id, &e),
        }
    }

    /// Binary frames are not part of the protocol; drop and report.
    pub fn on_binary(&self, id: &ConnectionId) -> FrameOutcome {
        self.reject(id, &ProtocolError::Binary)
    }

    /// Tear down a connection. Safe to call more than once.
    pub async fn on_close(&self, id: &ConnectionId) -> Option<RemovedConnection> {
        self.registry.unregister(id).await
    }

    /// Apply one decoded event on behalf of connection `id`.
    pub async fn handle_event(&self, id: &ConnectionId, event: InboundEvent) -> FrameOutcome {
        tracing::trace!(connection_id = %id, event = event.kind(), "inbound event");

        let result = match event {
            InboundEvent::Identify { user_id } => {
                self.registry.identify(id, user_id).await.map(|_| ())
            }
            InboundEvent::JoinChannel { channel_id } => {
                self.registry.join(id, channel_id).await.map(|_| ())
            }
            InboundEvent::LeaveChannel { channel_id } => {
                self.registry.leave(id, channel_id).await.map(|_| ())
            }
            InboundEvent::MessageBroadcastRequest { channel_id, data } => {
                if !self.admit_broadcast(id, &channel_id).await {
                    return FrameOutcome::Ignored;
                }
                let event = OutboundEvent::MessageBroadcast { message: data };
                return FrameOutcome::Fanout(self.fanout(channel_id, &event, Some(id)).await);
            }
            InboundEvent::TypingIndicator {
                channel_id,
                user_id,
                is_typing,
            } => {
                if !self.admit_broadcast(id, &channel_id).await {
                    return FrameOutcome::Ignored;
                }
                let event = typing_event(user_id, channel_id, is_typing);
                return FrameOutcome::Fanout(self.fanout(channel_id, &event, Some(id)).await);
            }
        };

        match result {
            Ok(()) => FrameOutcome::Applied,
            Err(e) => {
                self.observer.registry_anomaly(id, &e.to_string());
                FrameOutcome::Ignored
            }
        }
    }

    fn reject(&self, id: &ConnectionId, error: &ProtocolError) -> FrameOutcome {
        self.observer.frame_rejected(id, &error.to_string());
        FrameOutcome::Rejected
    }

    /// Decide whether a broadcast from `id` may proceed.
    async fn admit_broadcast(&self, id: &ConnectionId, channel: &ChannelId) -> bool {
        match self.registry.state_of(id).await {
            ConnectionState::Identified => true,
            ConnectionState::Pending => {
                let dropped = self.unidentified_policy == UnidentifiedPolicy::Drop;
                self.observer.unidentified_broadcast(id, channel, dropped);
                !dropped
            }
            ConnectionState::Destroyed => {
                self.observer
                    .registry_anomaly(id, "broadcast from unregistered connection");
                false
            }
        }
    }

    /// Send `event` to every writable subscriber of `channel` except `exclude`.
    async fn fanout(
        &self,
        channel: ChannelId,
        event: &OutboundEvent,
        exclude: Option<&ConnectionId>,
    ) -> FanoutReport {
        let frame = match event.encode() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(channel_id = %channel, error = %e, "failed to encode outbound event");
                return FanoutReport::default();
            }
        };

        let snapshot = self.registry.subscribers_of(&channel).await;
        let mut report = FanoutReport::default();

        for subscriber in &snapshot {
            if exclude == Some(&subscriber.connection_id) {
                continue;
            }
            if !subscriber.sink.is_writable() {
                report.skipped += 1;
                continue;
            }
            match subscriber.sink.send(Arc::clone(&frame)) {
                Ok(()) => {
                    report.delivered += 1;
                    tracing::trace!(connection_id = %subscriber.connection_id, "frame queued");
                }
                Err(e) => {
                    report.failed += 1;
                    self.observer
                        .send_failed(&subscriber.connection_id, &channel, e);
                }
            }
        }

        tracing::debug!(
            channel_id = %channel,
            delivered = report.delivered,
            skipped = report.skipped,
            failed = report.failed,
            "fanout complete"
        );
        report
    }
}

fn typing_event(user_id: UserId, channel_id: ChannelId, is_typing: bool) -> OutboundEvent {
    OutboundEvent::TypingIndicator {
        user_id,
        channel_id,
        is_typing,
    }
}

#[async_trait]
impl MessageFanout for FanoutDispatcher {
    async fn broadcast_message(
        &self,
        channel: ChannelId,
        payload: serde_json::Value,
        origin: Option<ConnectionId>,
    ) -> FanoutReport {
        let event = OutboundEvent::MessageBroadcast { message: payload };
        self.fanout(channel, &event, origin.as_ref()).await
    }
}
