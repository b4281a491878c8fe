//! WebSocket upgrade handler for real-time chat connections.
//!
//! Handles the HTTP → WebSocket upgrade and manages the connection lifecycle:
//! 1. Upgrade to WebSocket
//! 2. Register the connection with a queue-backed sink
//! 3. Feed inbound text frames to the dispatcher, in arrival order
//! 4. Drain the outbound queue into the socket
//! 5. Unregister exactly once when either half finishes

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};

use super::{
    dispatcher::FanoutDispatcher,
    registry::ConnectionHandle,
    sink::ChannelSink,
};

/// State required for WebSocket handling.
#[derive(Clone)]
pub struct WebSocketState {
    pub dispatcher: Arc<FanoutDispatcher>,
    /// Capacity of each connection's outbound queue.
    pub outbound_queue_capacity: usize,
}

impl WebSocketState {
    pub fn new(dispatcher: Arc<FanoutDispatcher>, outbound_queue_capacity: usize) -> Self {
        Self {
            dispatcher,
            outbound_queue_capacity,
        }
    }
}

/// Handle WebSocket upgrade requests.
///
/// # Security
///
/// No authentication happens here. The identity in the client's `auth`
/// frame is trusted as asserted; session checks belong to the layer in
/// front of this route.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<WebSocketState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle an established WebSocket connection until it closes.
async fn handle_socket(socket: WebSocket, state: WebSocketState) {
    let (mut sender, mut receiver) = socket.split();

    let (sink, mut outbound_rx) = ChannelSink::bounded(state.outbound_queue_capacity);
    let handle = ConnectionHandle::new(Arc::new(sink));
    let connection_id = handle.id();

    if let Err(e) = state.dispatcher.on_open(handle).await {
        tracing::error!(connection_id = %connection_id, "Failed to register connection: {}", e);
        return;
    }
    tracing::info!(connection_id = %connection_id, "WebSocket connection opened");

    // Forward queued frames to the client
    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            if let Err(e) = sender.send(Message::Text(frame.to_string())).await {
                tracing::debug!(
                    connection_id = %connection_id,
                    "Send error, closing connection: {}",
                    e
                );
                break;
            }
        }
    });

    // Handle incoming frames from the client, one at a time
    let dispatcher = Arc::clone(&state.dispatcher);
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Text(text)) => {
                    let _ = dispatcher.on_frame(&connection_id, &text).await;
                }
                Ok(Message::Binary(_)) => {
                    let _ = dispatcher.on_binary(&connection_id);
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                    // WebSocket protocol ping/pong - handled automatically by axum
                }
                Ok(Message::Close(_)) => {
                    tracing::debug!(connection_id = %connection_id, "Client sent close frame");
                    break;
                }
                Err(e) => {
                    tracing::debug!(connection_id = %connection_id, "Receive error: {}", e);
                    break;
                }
            }
        }
    });

    // Wait for either half to finish, then stop the other
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    if let Some(removed) = state.dispatcher.on_close(&connection_id).await {
        tracing::info!(
            connection_id = %connection_id,
            user_id = ?removed.user_id.map(|u| u.value()),
            channels = removed.channels.len(),
            "WebSocket connection closed"
        );
    }
}

/// Create axum router for the WebSocket endpoint.
///
/// # Example
///
/// ```ignore
/// let app = Router::new()
///     .merge(websocket_router("/ws").with_state(ws_state));
/// ```
pub fn websocket_router(path: &str) -> axum::Router<WebSocketState> {
    use axum::routing::get;

    axum::Router::new().route(path, get(ws_handler))
}
