pub mod auth;
pub mod locations;

use axum::Json;

/// Liveness probe
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "RideLink API is running!" }))
}
