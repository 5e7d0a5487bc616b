//! Axum server setup and router configuration.

use crate::state::AppState;
use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use evpipe_core::events::RawRecord;
use evpipe_sdk::objects::{MetricsSnapshot, RecordAccepted};
use serde::Serialize;
use std::future::Future;
use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::TcpListener;

/// Build the main application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health check endpoint
        .route("/health", get(health_check))
        // Counter snapshot
        .route("/metrics", get(metrics))
        // Inbound records
        .route("/topics/{topic}/records", post(ingest_record))
        // Add state to all routes
        .with_state(state)
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Simple health check - returns OK if the server is running.
async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

/// Errors returned by the ingest endpoint.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("unknown topic: {0}")]
    UnknownTopic(String),

    #[error("record body is empty")]
    EmptyBody,

    #[error("pipeline is not accepting records")]
    Unavailable,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        let status = match &self {
            IngestError::UnknownTopic(_) => StatusCode::NOT_FOUND,
            IngestError::EmptyBody => StatusCode::BAD_REQUEST,
            IngestError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        };
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Accept one encoded event. The bytes are not inspected here; malformed
/// payloads fail in the decode stage like any other bad record.
async fn ingest_record(
    State(state): State<AppState>,
    Path(topic): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<RecordAccepted>), IngestError> {
    if topic != *state.topic {
        return Err(IngestError::UnknownTopic(topic));
    }
    if body.is_empty() {
        return Err(IngestError::EmptyBody);
    }

    let offset = state.next_offset();
    state
        .record_tx
        .send(RawRecord::new(offset, body))
        .await
        .map_err(|_| IngestError::Unavailable)?;

    tracing::trace!(offset, "Record accepted");
    Ok((StatusCode::ACCEPTED, Json(RecordAccepted { offset })))
}

/// Run the server until `shutdown` completes.
pub async fn run_server(
    router: Router,
    addr: SocketAddr,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), std::io::Error> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}
