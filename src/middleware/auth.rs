//! Authentication extractors
//!
//! Operator endpoints take an [`AuthenticatedUser`] argument; extraction
//! fails with a localized 401 when the `Authorization: Bearer <token>`
//! header is missing or the token does not verify.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::handlers::error::ApiError;
use crate::middleware::locale::RequestLocale;
use crate::state::AppState;
use crate::utils::errors::OfficialIdError;

/// Raw bearer token from the `Authorization` header
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

impl BearerToken {
    pub fn from_parts(parts: &Parts) -> Result<Self, OfficialIdError> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| OfficialIdError::Authentication("Missing authorization header".to_string()))?;

        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .ok_or_else(|| OfficialIdError::Authentication("Expected 'Bearer <token>'".to_string()))?;

        if token.is_empty() {
            return Err(OfficialIdError::Authentication("Empty bearer token".to_string()));
        }

        Ok(Self(token.to_string()))
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for BearerToken {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Self::from_parts(parts).map_err(|e| locale(parts, state).error(e))
    }
}

/// Caller identity verified from the bearer token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: Option<String>,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = BearerToken::from_request_parts(parts, state).await?;

        match state.auth().verify(&token.0) {
            Ok(context) => {
                debug!(user_id = %context.user_id, "Bearer token accepted");
                Ok(Self {
                    user_id: context.user_id,
                    email: context.email,
                })
            }
            Err(e) => {
                warn!(path = %parts.uri.path(), "Invalid bearer token");
                Err(locale(parts, state).error(e))
            }
        }
    }
}

fn locale(parts: &Parts, state: &AppState) -> RequestLocale {
    RequestLocale::from_parts(parts, state.i18n.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(authorization: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/events/approve");
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(BearerToken::from_parts(&parts(Some("Bearer abc.def"))).unwrap().0, "abc.def");
        assert!(BearerToken::from_parts(&parts(None)).is_err());
        assert!(BearerToken::from_parts(&parts(Some("Basic abc"))).is_err());
        assert!(BearerToken::from_parts(&parts(Some("Bearer   "))).is_err());
    }
}
