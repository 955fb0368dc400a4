use axum::{extract::State, response::Json, routing::get, Router};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct VersionInfo {
    pub version: String,
    pub env: String,
}

/// Unauthenticated liveness and build information
pub fn system_routes(version: VersionInfo) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/version", get(version_info))
        .with_state(version)
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn version_info(State(version): State<VersionInfo>) -> Json<VersionInfo> {
    Json(version)
}
