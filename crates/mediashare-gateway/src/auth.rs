//! Bearer token validation against the identity provider

use crate::{ApiError, ErrorCode};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// Identity resolved from a bearer token
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    /// Username
    pub username: String,
    /// When the bearer token stops being valid
    pub expires_at: DateTime<Utc>,
}

/// The single call the gateway needs from an identity provider
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve a bearer token to an identity, failing if it is not valid
    async fn introspect(&self, token: &str) -> Result<Identity, ApiError>;
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (username)
    pub sub: String,
    /// Expiration time
    pub exp: i64,
    /// Issued at
    pub iat: Option<i64>,
    /// Issuer
    pub iss: Option<String>,
}

/// Validate a JWT token and extract claims
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, ApiError> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    decode::<Claims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!("Token validation failed: {}", e);
            ApiError::new(ErrorCode::InvalidToken, "Invalid or expired token")
        })
}

/// Identity provider validating HS256 JWTs locally
pub struct JwtIdentityProvider {
    secret: String,
}

impl JwtIdentityProvider {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn introspect(&self, token: &str) -> Result<Identity, ApiError> {
        let claims = validate_token(token, &self.secret)?;
        if claims.sub.is_empty() {
            return Err(ApiError::new(ErrorCode::InvalidToken, "Token has no subject"));
        }
        let expires_at = DateTime::from_timestamp(claims.exp, 0)
            .ok_or_else(|| ApiError::new(ErrorCode::InvalidToken, "Invalid expiry"))?;
        Ok(Identity {
            username: claims.sub,
            expires_at,
        })
    }
}

/// Development provider: the bearer token is the username.
///
/// Only installed when authentication is disabled.
pub struct DevIdentityProvider {
    ttl: Duration,
}

impl DevIdentityProvider {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }
}

#[async_trait]
impl IdentityProvider for DevIdentityProvider {
    async fn introspect(&self, token: &str) -> Result<Identity, ApiError> {
        if token.is_empty() {
            return Err(ApiError::new(ErrorCode::InvalidToken, "Empty token"));
        }
        Ok(Identity {
            username: token.to_string(),
            expires_at: Utc::now() + self.ttl,
        })
    }
}

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .or_else(|| auth_header.strip_prefix("bearer "))
}
