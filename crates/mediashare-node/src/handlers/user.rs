//! User authorization on this node

use crate::{NodeError, NodeState};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mediashare_core::validate_segment;
use std::sync::Arc;
use tracing::{info, warn};

/// POST /user/{username}/authenticate - Authorize a user with a fresh token.
///
/// The access link is published before the session exists; if it cannot be
/// written the call fails and no session is created.
pub async fn authenticate_user(
    State(state): State<Arc<NodeState>>,
    Path(username): Path<String>,
    body: Result<Json<String>, JsonRejection>,
) -> Result<Response, NodeError> {
    let Json(token) =
        body.map_err(|e| NodeError::invalid(format!("token must be a JSON string: {e}")))?;
    validate_segment("username", &username)?;
    validate_segment("token", &token)?;

    state.links.publish(&token, &username).await?;
    let outcome = match state.sessions.add_session(&username, &token) {
        Ok(outcome) => outcome,
        Err(e) => {
            state.links.revoke(&token).await.ok();
            return Err(e);
        }
    };

    if let Some(old) = outcome.replaced_token {
        revoke(&state, &old).await;
    }
    for expired in outcome.expired {
        info!(username = %expired.username, "Session expired");
        revoke(&state, &expired.token).await;
    }

    info!(username = %username, sessions = state.sessions.len(), "User authenticated");
    Ok(StatusCode::OK.into_response())
}

/// POST /user/{username}/unauthenticate - Drop a user's session and link
pub async fn unauthenticate_user(
    State(state): State<Arc<NodeState>>,
    Path(username): Path<String>,
) -> Result<Response, NodeError> {
    if let Some(session) = state.sessions.remove(&username) {
        state.links.revoke(&session.token).await?;
        info!(username = %username, "User unauthenticated");
    }
    Ok(StatusCode::OK.into_response())
}

async fn revoke(state: &NodeState, token: &str) {
    if let Err(e) = state.links.revoke(token).await {
        warn!(error = %e, "Could not revoke stale access link");
    }
}
