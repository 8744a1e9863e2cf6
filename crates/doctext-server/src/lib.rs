//! Connection Supervisor (CS): accepts WebSocket connections, decodes and
//! dispatches frames to the right document's Session Coordinator, and
//! exposes the ambient `/healthz` and `/metrics` HTTP surface.

mod config;
mod registry;
mod ws;

pub use config::Args;
pub use registry::DocumentRegistry;

use axum::{
    extract::{ws::WebSocketUpgrade, State},
    response::Json,
    routing::get,
    Router,
};
use doctext_types::ConnectionIdAllocator;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Shared state reachable from every request handler.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<DocumentRegistry>,
    pub config: doctext_sync::SessionConfig,
    conn_alloc: Arc<ConnectionIdAllocator>,
    started_at: Arc<Instant>,
}

impl AppState {
    #[must_use]
    pub fn new(config: doctext_sync::SessionConfig) -> Self {
        Self {
            registry: Arc::new(DocumentRegistry::new(config.clone())),
            config,
            conn_alloc: Arc::new(ConnectionIdAllocator::new()),
            started_at: Arc::new(Instant::now()),
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
}

async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}

#[derive(Serialize)]
struct MetricsResponse {
    open_documents: usize,
    uptime_secs: u64,
}

async fn metrics(State(state): State<AppState>) -> Json<MetricsResponse> {
    Json(MetricsResponse {
        open_documents: state.registry.document_count().await,
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> axum::response::Response {
    let conn_id = state.conn_alloc.allocate();
    ws.on_upgrade(move |socket| ws::handle_socket(socket, state, conn_id))
}

/// Builds the full HTTP/WebSocket router for the document service.
#[must_use]
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .route("/ws", get(ws_handler))
        .with_state(state)
}

/// Spawns a background task that periodically sweeps every open document
/// for idle/stale connections.
pub fn spawn_sweeper(registry: Arc<DocumentRegistry>, interval: std::time::Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let evicted = registry.sweep_all().await;
            for (document_id, conns) in evicted {
                tracing::info!(
                    "evicted {} stale connection(s) from document {}",
                    conns.len(),
                    document_id
                );
            }
        }
    });
}
