//! Request locale detection

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::ACCEPT_LANGUAGE;
use axum::http::request::Parts;

use crate::handlers::error::ApiError;
use crate::i18n::{I18n, TranslationParams};
use crate::state::AppState;
use crate::utils::errors::OfficialIdError;

/// Language negotiated from `Accept-Language`, with the catalog to render in
#[derive(Debug, Clone)]
pub struct RequestLocale {
    pub language: String,
    i18n: Arc<I18n>,
}

impl RequestLocale {
    pub fn new(i18n: Arc<I18n>, accept_language: Option<&str>) -> Self {
        let language = i18n.detect_language(accept_language);
        Self { language, i18n }
    }

    pub fn from_parts(parts: &Parts, i18n: Arc<I18n>) -> Self {
        let accept_language = parts.headers.get(ACCEPT_LANGUAGE).and_then(|value| value.to_str().ok());
        Self::new(i18n, accept_language)
    }

    pub fn t(&self, key: &str, params: Option<&TranslationParams>) -> String {
        self.i18n.t(key, &self.language, params)
    }

    pub fn tp(&self, key: &str, count: i64, params: Option<&TranslationParams>) -> String {
        self.i18n.tp(key, &self.language, count, params)
    }

    /// Localized error response
    pub fn error(&self, error: OfficialIdError) -> ApiError {
        ApiError::localized(&error, &self.i18n, &self.language)
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for RequestLocale {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts, state.i18n.clone()))
    }
}
