use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::AppState;

/// GET /health: liveness plus a round-trip to Postgres.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    if let Err(e) = sqlx::query("SELECT 1").execute(&state.db).await {
        tracing::warn!("health check: database unreachable: {e}");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "error", "db": "unreachable" })),
        );
    }
    (StatusCode::OK, Json(json!({ "status": "ok", "db": "connected" })))
}
