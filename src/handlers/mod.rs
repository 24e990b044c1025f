//! HTTP handlers module
//!
//! Routes, the JSON error envelope and the endpoint handlers:
//! - Event registration, approval, cancellation and RSVP
//! - Participant listing and public ticket view
//! - Health probes

pub mod error;
pub mod events;
pub mod health;

pub use error::ApiError;

use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::config::ServerConfig;
use crate::middleware::log_requests;
use crate::state::AppState;

/// Build the application router
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.settings.server);

    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::ready))
        .route("/events/register", post(events::register))
        .route("/events/approve", post(events::approve))
        .route("/events/cancel", post(events::cancel))
        .route("/events/rsvp", post(events::rsvp))
        .route("/events/:event_id/participants", get(events::participants))
        .route("/events/tickets/:ticket_number", get(events::ticket))
        .layer(axum::middleware::from_fn(log_requests))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Any origin when none are configured, otherwise the listed ones
fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT_LANGUAGE]);

    if config.cors_origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(origins))
}
