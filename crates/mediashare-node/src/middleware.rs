//! HTTP middleware for gateway authentication and logging

use crate::{NodeError, NodeState};
use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use mediashare_client::SESSION_TOKEN_HEADER;
use mediashare_core::secrets_match;
use std::sync::Arc;
use tracing::{info, warn};

/// Only the gateway may call the control plane: it must present this
/// node's secret as bearer credential
pub async fn gateway_auth_middleware(
    State(state): State<Arc<NodeState>>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, NodeError> {
    let presented = auth.as_ref().map(|TypedHeader(a)| a.token()).unwrap_or_default();

    if !secrets_match(&state.config.secret, presented) {
        warn!(uri = %request.uri(), "Rejected call without the node secret");
        return Err(NodeError::unauthorized("invalid node credentials"));
    }

    Ok(next.run(request).await)
}

/// Check the per-user token carried by a file operation
pub fn require_user_session(
    state: &NodeState,
    headers: &HeaderMap,
    username: &str,
) -> Result<(), NodeError> {
    let token = headers
        .get(SESSION_TOKEN_HEADER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default();

    if state.sessions.verify(username, token) {
        Ok(())
    } else {
        Err(NodeError::unauthorized(format!(
            "no active session for {username}"
        )))
    }
}

/// Logging middleware
pub async fn logging_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = std::time::Instant::now();

    let response = next.run(request).await;

    info!(
        method = %method,
        uri = %uri,
        status = %response.status().as_u16(),
        duration_ms = %start.elapsed().as_millis(),
        "Request completed"
    );

    response
}
