//! Health check endpoints.

use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    status: String,
    /// RFC 3339, UTC
    timestamp: String,
    version: String,
}

/// Liveness check (is the server running?)
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Plain-text banner
pub async fn root() -> &'static str {
    "Backend is running."
}
