//! WebSocket adapters for real-time channel fanout.
//!
//! This module accepts client connections, tracks their identity and channel
//! subscriptions, and relays `new_message` and `typing` events between the
//! subscribers of a channel.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    ws_handler (one task pair per socket)             │
//! │   reader: text frame → dispatcher      writer: queue → socket       │
//! └─────────────────────────────────────────────────────────────────────┘
//!                 │ on_open / on_frame / on_close        ▲ ChannelSink
//!                 ▼                                      │
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                       FanoutDispatcher                               │
//! │   - Decodes InboundEvent                                             │
//! │   - Applies auth / join / leave to the registry                      │
//! │   - Fans out new_message / typing, excluding the sender              │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                     │
//!                                     ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      ConnectionRegistry                              │
//! │   Channel: 10          Channel: 11          Channel: 12             │
//! │   ├── conn-a           ├── conn-a           └── conn-d              │
//! │   ├── conn-b           └── conn-c                                    │
//! │   └── conn-c                                                         │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`messages`] - Wire protocol types and frame codec
//! - [`registry`] - Connection and subscription registry
//! - [`dispatcher`] - Event handling and fanout
//! - [`sink`] - Queue-backed connection sink
//! - [`observer`] - `tracing`-backed failure observer
//! - [`handler`] - Axum WebSocket upgrade handler

pub mod dispatcher;
pub mod handler;
pub mod messages;
pub mod observer;
pub mod registry;
pub mod sink;

pub use dispatcher::{FanoutDispatcher, FrameOutcome};
pub use handler::{websocket_router, ws_handler, WebSocketState};
pub use messages::{FrameCodec, InboundEvent, OutboundEvent, ProtocolError};
pub use observer::TracingObserver;
pub use registry::{
    ConnectionHandle, ConnectionRegistry, RegistryError, RemovedConnection, Subscriber,
    SubscriberSnapshot,
};
pub use sink::ChannelSink;
