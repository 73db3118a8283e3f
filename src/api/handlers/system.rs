//! System endpoints: health check and live connection stats.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
    store: String,
    timestamp: String,
    version: String,
}

/// Live connection statistics of this process.
#[derive(Debug, Serialize, ToSchema)]
pub struct StatsResponse {
    /// Open connections per namespace.
    connections: Vec<NamespaceCount>,
    /// Non-empty local rooms.
    rooms: usize,
    /// Frames queued to connections.
    frames_delivered: u64,
    /// Frames dropped on full or closed queues.
    frames_dropped: u64,
    /// Envelopes published by this process.
    envelopes_published: u64,
    /// Publishes the bus rejected.
    publish_failures: u64,
}

/// Connection count of one namespace.
#[derive(Debug, Serialize, ToSchema)]
pub struct NamespaceCount {
    namespace: String,
    connections: usize,
}

/// `GET /health`: service liveness plus shared store reachability.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns 200 when the shared store answers a ping, 503 otherwise.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Shared store unreachable", body = HealthResponse),
    )
)]
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let (status, store, code) = match state.store.ping().await {
        Ok(()) => ("healthy", "ok".to_string(), StatusCode::OK),
        Err(e) => {
            tracing::warn!(error = %e, "health check: store unreachable");
            ("degraded", e.to_string(), StatusCode::SERVICE_UNAVAILABLE)
        }
    };
    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            store,
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// `GET /stats`: live connections per namespace and local room count.
#[utoipa::path(
    get,
    path = "/stats",
    tag = "System",
    summary = "Connection statistics",
    responses(
        (status = 200, description = "Counters of this process", body = StatsResponse),
    )
)]
pub async fn stats_handler(State(state): State<AppState>) -> impl IntoResponse {
    let connections = state
        .hub
        .connection_counts()
        .await
        .into_iter()
        .map(|(namespace, connections)| NamespaceCount {
            namespace: namespace.to_string(),
            connections,
        })
        .collect();
    Json(StatsResponse {
        connections,
        rooms: state.hub.room_count().await,
        frames_delivered: state.hub.delivered_count(),
        frames_dropped: state.hub.dropped_count(),
        envelopes_published: state.bridge.published_count(),
        publish_failures: state.bridge.publish_failure_count(),
    })
}

/// System routes mounted at the root level (not under /api/v1).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
}
