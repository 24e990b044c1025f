//! Authentication service implementation
//!
//! Sessions are issued by the identity provider in front of this service;
//! here we only verify HS256 bearer tokens and turn them into an
//! [`AuthContext`]. Authorization (who may manage which event) is decided in
//! the persistence layer from organization membership.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::utils::errors::{OfficialIdError, Result};

/// Token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

/// Authenticated caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub email: Option<String>,
}

#[derive(Clone)]
pub struct AuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: Option<String>,
}

impl AuthService {
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
        }

        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            issuer: config.issuer.clone(),
        }
    }

    /// Verify a bearer token
    pub fn verify(&self, token: &str) -> Result<AuthContext> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            debug!(error = %e, "Rejected bearer token");
            OfficialIdError::Authentication(e.to_string())
        })?;

        Ok(AuthContext {
            user_id: data.claims.sub,
            email: data.claims.email,
        })
    }

    /// Sign a token for `user_id`, valid for `ttl`
    pub fn issue(&self, user_id: Uuid, email: Option<&str>, ttl: Duration) -> Result<String> {
        let claims = Claims {
            sub: user_id,
            email: email.map(str::to_string),
            exp: (Utc::now() + ttl).timestamp(),
            iss: self.issuer.clone(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| OfficialIdError::Authentication(e.to_string()))
    }
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService").field("issuer", &self.issuer).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(secret: &str, issuer: Option<&str>) -> AuthService {
        AuthService::new(&AuthConfig {
            jwt_secret: secret.to_string(),
            issuer: issuer.map(str::to_string),
        })
    }

    #[test]
    fn test_issue_and_verify() {
        let auth = service("secret", None);
        let user_id = Uuid::new_v4();
        let token = auth.issue(user_id, Some("admin@circle.id"), Duration::minutes(5)).unwrap();

        let context = auth.verify(&token).unwrap();
        assert_eq!(context.user_id, user_id);
        assert_eq!(context.email.as_deref(), Some("admin@circle.id"));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = service("secret", None).issue(Uuid::new_v4(), None, Duration::minutes(5)).unwrap();
        let err = service("other", None).verify(&token).unwrap_err();
        assert!(matches!(err, OfficialIdError::Authentication(_)));
    }

    #[test]
    fn test_expired_token_rejected() {
        let auth = service("secret", None);
        let token = auth.issue(Uuid::new_v4(), None, Duration::hours(-1)).unwrap();
        assert!(auth.verify(&token).is_err());
    }

    #[test]
    fn test_issuer_checked() {
        let token = service("secret", Some("someone-else")).issue(Uuid::new_v4(), None, Duration::minutes(5)).unwrap();
        assert!(service("secret", Some("official.id")).verify(&token).is_err());
        assert!(service("secret", Some("someone-else")).verify(&token).is_ok());
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(service("secret", None).verify("not.a.jwt").is_err());
    }
}
