//! HTTP adapters - Router assembly and plain HTTP endpoints.
//!
//! Each surface has its own router and state; [`build_router`] merges them
//! and applies the cross-cutting layers (request tracing, CORS).

pub mod health;

use std::sync::Arc;

use axum::Router;
use http::HeaderValue;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::adapters::websocket::{websocket_router, FanoutDispatcher, WebSocketState};
use crate::config::AppConfig;

pub use health::{health_router, HealthResponse, HealthState};

/// Build the full application router.
pub fn build_router(config: &AppConfig, dispatcher: Arc<FanoutDispatcher>) -> Router {
    let ws_state = WebSocketState::new(
        Arc::clone(&dispatcher),
        config.realtime.outbound_queue_capacity,
    );
    let health_state = HealthState::new(Arc::clone(dispatcher.registry()));

    let router = Router::new()
        .merge(websocket_router(&config.realtime.path).with_state(ws_state))
        .merge(health_router().with_state(health_state))
        .layer(TraceLayer::new_for_http());

    match cors_layer(config) {
        Some(cors) => router.layer(cors),
        None => router,
    }
}

/// CORS policy from `server.cors_origins`.
///
/// With no origins configured, development is permissive and production
/// gets no CORS layer at all.
fn cors_layer(config: &AppConfig) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = config
        .server
        .cors_origins_list()
        .into_iter()
        .filter_map(|origin| match HeaderValue::from_str(&origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if !origins.is_empty() {
        Some(CorsLayer::new().allow_origin(origins))
    } else if config.is_production() {
        None
    } else {
        Some(CorsLayer::permissive())
    }
}
