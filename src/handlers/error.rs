//! JSON error envelope
//!
//! Every failure leaves the API as `{success: false, error, code, details?}`
//! with a localized `error` message. Internal error text is logged, never
//! returned.

use std::collections::BTreeMap;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use tracing::{error, warn};

use crate::i18n::{I18n, TranslationParams};
use crate::utils::errors::{ErrorSeverity, OfficialIdError};
use crate::utils::logging::log_api_error;
use crate::utils::validation::ValidationErrors;

#[derive(Debug, Clone)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    details: Option<Value>,
    retry_after_secs: Option<u64>,
}

impl ApiError {
    /// Map a domain error onto status, code and a message in `language`
    pub fn localized(err: &OfficialIdError, i18n: &I18n, language: &str) -> Self {
        let (status, code, key) = classify(err);
        let mut api_error = Self {
            status,
            code,
            message: i18n.t(key, language, None),
            details: None,
            retry_after_secs: None,
        };

        match err {
            OfficialIdError::Validation(errors) => {
                api_error.details = Some(validation_details(errors, i18n, language));
            }
            OfficialIdError::RateLimitExceeded { retry_after_secs } => {
                let params = TranslationParams::from([("seconds".to_string(), retry_after_secs.to_string())]);
                api_error.message = i18n.t(key, language, Some(&params));
                api_error.retry_after_secs = Some(*retry_after_secs);
            }
            _ => {}
        }

        match err.severity() {
            ErrorSeverity::Critical | ErrorSeverity::Error => log_api_error("http", &err.to_string(), Some(code)),
            ErrorSeverity::Warning => warn!(code = code, error = %err, "Request rejected"),
            ErrorSeverity::Info => {}
        }

        api_error
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

fn classify(err: &OfficialIdError) -> (StatusCode, &'static str, &'static str) {
    match err {
        OfficialIdError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", "errors.validation"),
        OfficialIdError::EventNotFound { .. } => (StatusCode::NOT_FOUND, "EVENT_NOT_FOUND", "errors.event_not_found"),
        OfficialIdError::TicketNotFound { .. } => (StatusCode::NOT_FOUND, "TICKET_NOT_FOUND", "errors.ticket_not_found"),
        OfficialIdError::RegistrationNotFound { .. } => {
            (StatusCode::NOT_FOUND, "REGISTRATION_NOT_FOUND", "errors.registration_not_found")
        }
        OfficialIdError::NoPendingRegistrations => (StatusCode::NOT_FOUND, "NO_PENDING_REGISTRATIONS", "errors.no_pending"),
        OfficialIdError::DuplicateRegistration { .. } => {
            (StatusCode::CONFLICT, "DUPLICATE_REGISTRATION", "errors.duplicate_registration")
        }
        OfficialIdError::EventFull { .. } => (StatusCode::BAD_REQUEST, "EVENT_FULL", "errors.event_full"),
        OfficialIdError::RegistrationNotConfirmed { .. } => {
            (StatusCode::BAD_REQUEST, "REGISTRATION_NOT_CONFIRMED", "errors.registration_not_confirmed")
        }
        OfficialIdError::Authentication(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "errors.unauthorized"),
        OfficialIdError::PermissionDenied(_) => (StatusCode::FORBIDDEN, "FORBIDDEN", "errors.forbidden"),
        OfficialIdError::RateLimitExceeded { .. } => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED", "errors.rate_limited"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", "errors.internal"),
    }
}

/// `{field: [message, ...]}` with each violation rendered in `language`
fn validation_details(errors: &ValidationErrors, i18n: &I18n, language: &str) -> Value {
    let fields: BTreeMap<&str, Vec<String>> = errors
        .fields()
        .iter()
        .map(|(field, violations)| {
            let messages = violations
                .iter()
                .map(|violation| {
                    let params: TranslationParams = violation.params.clone().into_iter().collect();
                    i18n.t(&violation.key, language, Some(&params))
                })
                .collect();
            (field.as_str(), messages)
        })
        .collect();

    json!(fields)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "success": false,
            "error": self.message,
            "code": self.code,
        });
        if let Some(details) = self.details {
            body["details"] = details;
        }
        if let Some(seconds) = self.retry_after_secs {
            body["retryAfter"] = json!(seconds);
        }

        let mut response = (self.status, Json(body)).into_response();
        if let Some(seconds) = self.retry_after_secs {
            match HeaderValue::from_str(&seconds.to_string()) {
                Ok(value) => {
                    response.headers_mut().insert(header::RETRY_AFTER, value);
                }
                Err(e) => error!(error = %e, "Invalid Retry-After value"),
            }
        }
        response
    }
}
