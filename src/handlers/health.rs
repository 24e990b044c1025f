//! Liveness and readiness probes

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use crate::state::AppState;

/// Process is up
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": crate::NAME,
        "version": crate::VERSION,
    }))
}

/// Database reachable and notification worker alive
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let status = state.services.health_check(&state.database).await;
    let stats = state.notifications().get_stats();

    let code = if status.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        code,
        Json(json!({
            "status": if status.is_healthy() { "ready" } else { "degraded" },
            "database": status.database_healthy,
            "notificationWorker": status.notification_worker_running,
            "notifications": {
                "sent": stats.total_sent,
                "failed": stats.total_failed,
            },
            "issues": status.get_issues(),
        })),
    )
}
