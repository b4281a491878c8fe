//! WebSocket message types for channel fanout.
//!
//! Defines the protocol between server and connected clients. Every frame is
//! a single JSON text message tagged by `type`:
//! - Client → Server: `auth`, `join_channel`, `leave_channel`, `new_message`, `typing`
//! - Server → Client: `new_message`, `typing`

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::foundation::{ChannelId, UserId};
use crate::ports::OutboundFrame;

/// Default upper bound on an inbound frame, in bytes.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 64 * 1024;

// ============================================
// Client → Server Messages
// ============================================

/// All events that can be received from a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEvent {
    /// Assert the user behind this connection.
    #[serde(rename = "auth", rename_all = "camelCase")]
    Identify { user_id: UserId },

    /// Subscribe this connection to a channel.
    #[serde(rename_all = "camelCase")]
    JoinChannel { channel_id: ChannelId },

    /// Unsubscribe this connection from a channel.
    #[serde(rename_all = "camelCase")]
    LeaveChannel { channel_id: ChannelId },

    /// Relay a message to the other subscribers of a channel.
    #[serde(rename = "new_message", rename_all = "camelCase")]
    MessageBroadcastRequest {
        channel_id: ChannelId,
        data: serde_json::Value,
    },

    /// Relay a typing indicator to the other subscribers of a channel.
    #[serde(rename = "typing", rename_all = "camelCase")]
    TypingIndicator {
        channel_id: ChannelId,
        user_id: UserId,
        is_typing: bool,
    },
}

impl InboundEvent {
    /// Wire name of the event, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            InboundEvent::Identify { .. } => "auth",
            InboundEvent::JoinChannel { .. } => "join_channel",
            InboundEvent::LeaveChannel { .. } => "leave_channel",
            InboundEvent::MessageBroadcastRequest { .. } => "new_message",
            InboundEvent::TypingIndicator { .. } => "typing",
        }
    }

    /// The channel the event targets, if any.
    pub fn channel(&self) -> Option<ChannelId> {
        match self {
            InboundEvent::Identify { .. } => None,
            InboundEvent::JoinChannel { channel_id }
            | InboundEvent::LeaveChannel { channel_id }
            | InboundEvent::MessageBroadcastRequest { channel_id, .. }
            | InboundEvent::TypingIndicator { channel_id, .. } => Some(*channel_id),
        }
    }

    /// Whether handling the event fans out to other connections.
    pub fn is_broadcast(&self) -> bool {
        matches!(
            self,
            InboundEvent::MessageBroadcastRequest { .. } | InboundEvent::TypingIndicator { .. }
        )
    }
}

// ============================================
// Server → Client Messages
// ============================================

/// All events that can be sent to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundEvent {
    /// A message relayed from another subscriber of the channel.
    #[serde(rename = "new_message")]
    MessageBroadcast { message: serde_json::Value },

    /// A typing indicator relayed from another subscriber of the channel.
    #[serde(rename = "typing", rename_all = "camelCase")]
    TypingIndicator {
        user_id: UserId,
        channel_id: ChannelId,
        is_typing: bool,
    },
}

impl OutboundEvent {
    /// Encode once; the result is shared by every recipient of a fanout.
    pub fn encode(&self) -> Result<OutboundFrame, ProtocolError> {
        let json = serde_json::to_string(self).map_err(ProtocolError::Encode)?;
        Ok(OutboundFrame::from(json))
    }
}

// ============================================
// Codec
// ============================================

/// Why a frame could not be decoded or encoded.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("frame of {size} bytes exceeds limit of {limit} bytes")]
    TooLarge { size: usize, limit: usize },

    #[error("binary frames are not supported")]
    Binary,

    #[error("malformed frame: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("failed to encode frame: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Decoder for inbound text frames.
#[derive(Debug, Clone, Copy)]
pub struct FrameCodec {
    max_frame_bytes: usize,
}

impl FrameCodec {
    pub fn new(max_frame_bytes: usize) -> Self {
        Self { max_frame_bytes }
    }

    /// Decode a raw text frame into a typed event.
    ///
    /// Unknown `type` values and missing or mistyped fields are reported as
    /// [`ProtocolError::Malformed`].
    pub fn decode(&self, raw: &str) -> Result<InboundEvent, ProtocolError> {
        if raw.len() > self.max_frame_bytes {
            return Err(ProtocolError::TooLarge {
                size: raw.len(),
                limit: self.max_frame_bytes,
            });
        }
        serde_json::from_str(raw).map_err(ProtocolError::Malformed)
    }

    pub fn max_frame_bytes(&self) -> usize {
        self.max_frame_bytes
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_BYTES)
    }
}
