//! Liveness endpoint with real-time layer counters.

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::adapters::websocket::ConnectionRegistry;
use crate::domain::foundation::Timestamp;

/// State for the health endpoint.
#[derive(Clone)]
pub struct HealthState {
    pub registry: Arc<ConnectionRegistry>,
    pub started_at: Timestamp,
}

impl HealthState {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            registry,
            started_at: Timestamp::now(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub connections: usize,
    pub channels: usize,
    pub started_at: String,
    pub uptime_secs: u64,
}

/// `GET /health`
pub async fn health(State(state): State<HealthState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        connections: state.registry.connection_count().await,
        channels: state.registry.channel_count().await,
        started_at: state.started_at.to_rfc3339(),
        uptime_secs: state.started_at.elapsed_secs(),
    })
}

pub fn health_router() -> Router<HealthState> {
    Router::new().route("/health", get(health))
}
