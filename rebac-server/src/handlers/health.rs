use axum::{extract::State, http::StatusCode, Json};
use rebac_engine::{PageRequest, RelationQuery};
use serde::Serialize;
use tracing::warn;

use crate::server::RebacServer;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub uptime: u64,
}

/// Version information response
#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub name: String,
    pub version: String,
}

/// Liveness: the process is serving requests
pub async fn alive(State(server): State<RebacServer>) -> Json<HealthResponse> {
    Json(health("ok", &server))
}

/// Readiness: the tuple store answers queries
pub async fn ready(State(server): State<RebacServer>) -> (StatusCode, Json<HealthResponse>) {
    match server
        .engine
        .read_tuples(&RelationQuery::default(), PageRequest::first(1))
        .await
    {
        Ok(_) => (StatusCode::OK, Json(health("ok", &server))),
        Err(e) => {
            warn!(error = %e, "Tuple store not ready");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(health("unavailable", &server)),
            )
        }
    }
}

/// Version information handler
pub async fn version_info() -> Json<VersionResponse> {
    Json(VersionResponse {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

fn health(status: &str, server: &RebacServer) -> HealthResponse {
    HealthResponse {
        status: status.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        uptime: server.uptime_seconds(),
    }
}
