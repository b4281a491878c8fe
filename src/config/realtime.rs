//! Real-time fanout configuration

use serde::Deserialize;

use super::error::ValidationError;

const MAX_QUEUE_CAPACITY: usize = 65_536;

/// What to do with `new_message`/`typing` from a connection that never sent `auth`
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnidentifiedPolicy {
    /// Fan the event out anyway and log a warning
    #[default]
    Allow,
    /// Discard the event and log a warning
    Drop,
}

/// Real-time layer configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeConfig {
    /// Route the WebSocket upgrade is served on
    #[serde(default = "default_path")]
    pub path: String,

    /// Frames buffered per connection before sends start failing
    #[serde(default = "default_outbound_queue_capacity")]
    pub outbound_queue_capacity: usize,

    /// Largest inbound text frame accepted, in bytes
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,

    /// Handling of broadcasts from unidentified connections
    #[serde(default)]
    pub unidentified_policy: UnidentifiedPolicy,
}

impl RealtimeConfig {
    /// Validate real-time configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.path.starts_with('/') {
            return Err(ValidationError::InvalidPath);
        }
        if self.outbound_queue_capacity == 0 || self.outbound_queue_capacity > MAX_QUEUE_CAPACITY {
            return Err(ValidationError::InvalidQueueCapacity);
        }
        if self.max_frame_bytes == 0 {
            return Err(ValidationError::InvalidFrameLimit);
        }
        Ok(())
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            outbound_queue_capacity: default_outbound_queue_capacity(),
            max_frame_bytes: default_max_frame_bytes(),
            unidentified_policy: UnidentifiedPolicy::default(),
        }
    }
}

fn default_path() -> String {
    "/ws".to_string()
}

fn default_outbound_queue_capacity() -> usize {
    256
}

fn default_max_frame_bytes() -> usize {
    64 * 1024
}
