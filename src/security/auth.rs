//! Bearer token authentication.
//!
//! Every call must carry `authorization: Bearer <jwt>`. The token is checked
//! against a single shared HMAC secret; nothing from its claims is passed on.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use thiserror::Error;

const BEARER_PREFIX: &str = "Bearer ";

/// Why a call was refused.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("metadata is not provided")]
    MissingMetadata,
    #[error("authorization token is not provided")]
    MissingToken,
    #[error("invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
}

impl AuthError {
    /// Message returned to the caller. Token details stay in the logs.
    pub fn client_message(&self) -> &'static str {
        match self {
            AuthError::MissingMetadata => "metadata is not provided",
            AuthError::MissingToken => "authorization token is not provided",
            AuthError::InvalidToken(_) => "invalid token",
        }
    }
}

/// Decides whether a call's metadata carries a valid credential.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, headers: &HeaderMap) -> Result<(), AuthError>;
}

/// Stateless JWT verification with an HMAC shared secret.
pub struct JwtAuthenticator {
    key: DecodingKey,
    validation: Validation,
}

impl JwtAuthenticator {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Only the HMAC family is trusted.
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        validation.required_spec_claims.clear();
        validation.validate_aud = false;

        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }
}

impl std::fmt::Debug for JwtAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtAuthenticator")
            .field("algorithms", &self.validation.algorithms)
            .finish_non_exhaustive()
    }
}

impl Authenticator for JwtAuthenticator {
    fn authenticate(&self, headers: &HeaderMap) -> Result<(), AuthError> {
        let value = headers.get(AUTHORIZATION).ok_or(AuthError::MissingMetadata)?;
        let token = bearer_token(value.to_str().map_err(|_| AuthError::MissingToken)?);
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }

        decode::<serde_json::Value>(token, &self.key, &self.validation)?;
        Ok(())
    }
}

/// Strip the `Bearer ` prefix when present.
fn bearer_token(value: &str) -> &str {
    value.strip_prefix(BEARER_PREFIX).unwrap_or(value).trim()
}
