use axum::{routing::get, Json, Router};
use serde_json::json;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

pub fn routes() -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/live", get(liveness_check))
}

async fn health_check() -> Json<serde_json::Value> {
    debug!("Health check requested");

    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now()
    }))
}

// Kubernetes readiness probe
async fn readiness_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ready",
        "timestamp": chrono::Utc::now()
    }))
}

// Kubernetes liveness probe
async fn liveness_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "alive",
        "timestamp": chrono::Utc::now(),
        "uptime_seconds": SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
    }))
}
