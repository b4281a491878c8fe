//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the real-time core to external systems:
//! - `websocket` - Connection registry, fanout dispatcher and the axum WebSocket transport
//! - `http` - Router assembly and the health endpoint

pub mod http;
pub mod websocket;

pub use self::http::build_router;
pub use self::websocket::{ConnectionRegistry, FanoutDispatcher, TracingObserver};
