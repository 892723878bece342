//! HTTP middleware for authentication, rate limiting, etc.

use crate::auth::extract_bearer_token;
use crate::{ApiError, AppState, ErrorCode, GatewaySession};
use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use governor::{state::keyed::DefaultKeyedStateStore, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::{debug, info};

/// Rate limiter type
pub type KeyedRateLimiter =
    RateLimiter<String, DefaultKeyedStateStore<String>, governor::clock::DefaultClock>;

/// Create a rate limiter. A zero rate is raised to one request per second.
pub fn create_rate_limiter(requests_per_second: u32) -> Arc<KeyedRateLimiter> {
    let rate = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
    Arc::new(RateLimiter::keyed(Quota::per_second(rate)))
}

/// Authentication middleware.
///
/// Known bearer tokens reuse their session. A new token is introspected
/// once; the user's groups are resolved and cached in the new session.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ApiError::new(ErrorCode::AccessDenied, "Authentication required"))?;
    let token = extract_bearer_token(token)
        .ok_or_else(|| {
            ApiError::new(ErrorCode::InvalidToken, "Invalid Authorization header format")
        })?
        .to_string();

    let session = match state.sessions.get_by_token(&token) {
        Some(session) if session.is_expired() => {
            state.sessions.remove(&session);
            info!(username = %session.username, "Session expired");
            return Err(ApiError::new(ErrorCode::InvalidToken, "Session has expired"));
        }
        Some(session) => session,
        None => create_session(&state, token).await?,
    };

    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}

async fn create_session(state: &AppState, token: String) -> Result<GatewaySession, ApiError> {
    let identity = state.identity.introspect(&token).await?;
    let groups = state
        .store_call(state.store.groups_for_user(&identity.username))
        .await?;

    let session = state
        .sessions
        .insert(GatewaySession::new(identity, token, groups));
    info!(
        username = %session.username,
        groups = session.groups.len(),
        "Session created"
    );
    Ok(session)
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<KeyedRateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let username = request
        .extensions()
        .get::<GatewaySession>()
        .map(|s| s.username.clone())
        .unwrap_or_else(|| "anonymous".to_string());

    if limiter.check_key(&username).is_err() {
        debug!(username = %username, "Rate limited");
        return Err(ApiError::new(
            ErrorCode::SlowDown,
            "Please reduce your request rate",
        ));
    }

    Ok(next.run(request).await)
}

/// Request ID middleware - adds x-request-id header
pub async fn request_id_middleware(mut request: Request<Body>, next: Next) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();
    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

/// Request ID extension
#[derive(Clone)]
pub struct RequestId(pub String);

/// Logging middleware
pub async fn logging_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = std::time::Instant::now();

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status();

    info!(
        method = %method,
        uri = %uri,
        status = %status.as_u16(),
        duration_ms = %duration.as_millis(),
        "Request completed"
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_rate_limiter() {
        let limiter = create_rate_limiter(1);

        assert!(limiter.check_key(&"alice".to_string()).is_ok());
        assert!(limiter.check_key(&"alice".to_string()).is_err());
        assert!(limiter.check_key(&"bob".to_string()).is_ok());
    }

    #[test]
    fn test_zero_rate_is_clamped() {
        let limiter = create_rate_limiter(0);
        assert!(limiter.check_key(&"alice".to_string()).is_ok());
    }
}
