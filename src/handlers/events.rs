//! Event registration endpoints
//!
//! Every handler rate limits first, then parses and validates its input,
//! then calls into [`RegistrationService`](crate::services::RegistrationService).

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::handlers::error::ApiError;
use crate::i18n::TranslationParams;
use crate::middleware::{AuthenticatedUser, RateLimitPolicy, RequestLocale};
use crate::models::{ApproveRegistrationsRequest, ParticipantsQuery, RegisterEventRequest, RsvpRequest};
use crate::services::{BatchItemResult, BatchSummary};
use crate::state::AppState;
use crate::utils::errors::OfficialIdError;
use crate::utils::validation::{FieldViolation, Validate, ValidationErrors};

type ApiResult<T> = std::result::Result<T, ApiError>;

/// Turn a body rejection into a field error on `body`
fn parse_body<T>(locale: &RequestLocale, body: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    body.map(|Json(value)| value).map_err(|rejection| {
        tracing::debug!(error = %rejection, "Malformed request body");
        locale.error(ValidationErrors::single("body", FieldViolation::new("validation.invalid_json")).into())
    })
}

pub async fn register(
    State(state): State<AppState>,
    locale: RequestLocale,
    headers: HeaderMap,
    body: Result<Json<RegisterEventRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    state
        .rate_limiter
        .enforce("register", &headers, RateLimitPolicy::PUBLIC_FORM)
        .await
        .map_err(|e| locale.error(e))?;

    let request = parse_body(&locale, body)?;
    let input = request.validate().map_err(|e| locale.error(e.into()))?;

    let registration = state
        .registrations()
        .register(input, &locale.language)
        .await
        .map_err(|e| locale.error(e))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "registration": registration,
            "message": locale.t("messages.registered", None),
        })),
    ))
}

#[derive(Debug, Serialize)]
struct BatchItemView {
    registration_id: String,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    ticket_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl BatchItemView {
    fn new(result: BatchItemResult, locale: &RequestLocale) -> Self {
        let error = result.error;
        Self {
            success: error.is_none(),
            registration_id: result.registration_id,
            ticket_number: result.ticket_number,
            error: error.map(|e| e.code().to_string()),
            message: error.map(|e| locale.t(e.message_key(), None)),
        }
    }
}

fn batch_response(summary: BatchSummary, message_key: &str, locale: &RequestLocale) -> Json<Value> {
    let params = TranslationParams::from([
        ("processed".to_string(), summary.processed.to_string()),
        ("failed".to_string(), summary.failed.to_string()),
    ]);
    let message = locale.tp(message_key, summary.processed as i64, Some(&params));
    let results: Vec<BatchItemView> = summary.results.into_iter().map(|r| BatchItemView::new(r, locale)).collect();

    Json(json!({
        "success": true,
        "processed": summary.processed,
        "failed": summary.failed,
        "message": message,
        "results": results,
    }))
}

pub async fn approve(
    State(state): State<AppState>,
    locale: RequestLocale,
    headers: HeaderMap,
    user: AuthenticatedUser,
    body: Result<Json<ApproveRegistrationsRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    state
        .rate_limiter
        .enforce("approve", &headers, RateLimitPolicy::AUTHENTICATED)
        .await
        .map_err(|e| locale.error(e))?;

    let ids = parse_body(&locale, body)?.validate().map_err(|e| locale.error(e.into()))?;
    let summary = state.registrations().approve(&ids, user.user_id).await.map_err(|e| locale.error(e))?;

    Ok(batch_response(summary, "messages.approved", &locale))
}

pub async fn cancel(
    State(state): State<AppState>,
    locale: RequestLocale,
    headers: HeaderMap,
    user: AuthenticatedUser,
    body: Result<Json<ApproveRegistrationsRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    state
        .rate_limiter
        .enforce("cancel", &headers, RateLimitPolicy::AUTHENTICATED)
        .await
        .map_err(|e| locale.error(e))?;

    let ids = parse_body(&locale, body)?.validate().map_err(|e| locale.error(e.into()))?;
    let summary = state.registrations().cancel(&ids, user.user_id).await.map_err(|e| locale.error(e))?;

    Ok(batch_response(summary, "messages.cancelled", &locale))
}

pub async fn rsvp(
    State(state): State<AppState>,
    locale: RequestLocale,
    headers: HeaderMap,
    body: Result<Json<RsvpRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    state
        .rate_limiter
        .enforce("rsvp", &headers, RateLimitPolicy::PUBLIC_FORM)
        .await
        .map_err(|e| locale.error(e))?;

    let input = parse_body(&locale, body)?.validate().map_err(|e| locale.error(e.into()))?;
    let rsvp = state.registrations().rsvp(input).await.map_err(|e| locale.error(e))?;

    Ok(Json(json!({
        "success": true,
        "message": locale.t("messages.rsvp_saved", None),
        "rsvp": rsvp,
    })))
}

pub async fn participants(
    State(state): State<AppState>,
    locale: RequestLocale,
    headers: HeaderMap,
    user: AuthenticatedUser,
    Path(event_id): Path<String>,
    Query(query): Query<ParticipantsQuery>,
) -> ApiResult<Json<Value>> {
    state
        .rate_limiter
        .enforce("peserta-list", &headers, RateLimitPolicy::AUTHENTICATED)
        .await
        .map_err(|e| locale.error(e))?;

    let event_id = Uuid::parse_str(event_id.trim()).map_err(|_| {
        locale.error(ValidationErrors::single("event_id", FieldViolation::new("validation.invalid_uuid")).into())
    })?;
    let registered_on = query.validate().map_err(|e| locale.error(e.into()))?;

    let participants = state
        .registrations()
        .list_participants(event_id, user.user_id, registered_on)
        .await
        .map_err(|e| locale.error(e))?;

    Ok(Json(json!({
        "success": true,
        "total": participants.len(),
        "participants": participants,
    })))
}

pub async fn ticket(
    State(state): State<AppState>,
    locale: RequestLocale,
    headers: HeaderMap,
    Path(ticket_number): Path<String>,
) -> ApiResult<Json<Value>> {
    state
        .rate_limiter
        .enforce("ticket-view", &headers, RateLimitPolicy::PUBLIC_VIEW)
        .await
        .map_err(|e| locale.error(e))?;

    if ticket_number.is_empty() || !ticket_number.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(locale.error(OfficialIdError::TicketNotFound { ticket_number }));
    }

    let ticket = state.registrations().ticket_details(&ticket_number).await.map_err(|e| locale.error(e))?;
    let ticket_url = state
        .registrations()
        .ticket_url(&ticket.ticket_number)
        .map_err(|e| locale.error(e))?;

    Ok(Json(json!({
        "success": true,
        "ticket": ticket,
        "ticketUrl": ticket_url.as_str(),
    })))
}
