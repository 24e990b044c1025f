//! Request logging middleware
//!
//! One structured line per request: method, path, status and latency.
//! Server errors log at `error`, client errors at `warn`, the rest at `info`.

use std::time::Instant;

use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use tracing::{error, info, warn};

pub async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    let status = response.status();
    let latency_ms = started.elapsed().as_millis() as u64;
    log_completed(method.as_str(), &path, status, latency_ms);

    response
}

fn log_completed(method: &str, path: &str, status: StatusCode, latency_ms: u64) {
    if status.is_server_error() {
        error!(method = method, path = path, status = status.as_u16(), latency_ms = latency_ms, "Request failed");
    } else if status.is_client_error() {
        warn!(method = method, path = path, status = status.as_u16(), latency_ms = latency_ms, "Request rejected");
    } else {
        info!(method = method, path = path, status = status.as_u16(), latency_ms = latency_ms, "Request completed");
    }
}
