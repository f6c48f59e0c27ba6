use axum::Json;
use serde_json::json;

/// GET /health — liveness only; says nothing about the chain.
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
