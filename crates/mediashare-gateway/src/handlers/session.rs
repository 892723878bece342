//! Login and logout

use crate::{ApiError, AppState, GatewaySession, SkippedNode};
use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mediashare_core::{GroupId, NodeId};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{info, warn};

/// Session summary returned by login
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub username: String,
    pub groups: BTreeSet<GroupId>,
    pub node_tokens: HashMap<NodeId, String>,
    pub skipped: Vec<SkippedNode>,
}

/// POST /login - Authenticate the caller to every node they may use
pub async fn login(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<GatewaySession>,
) -> Result<Json<LoginResponse>, ApiError> {
    let report = match state.node_auth.authenticate_user_to_all(&session).await {
        Ok(report) => report,
        Err(e) => {
            warn!(username = %session.username, error = %e, "Login failed, dropping session");
            state.node_auth.unauthenticate_user_from_all(&session).await;
            state.sessions.remove(&session);
            return Err(e);
        }
    };

    let current = state
        .sessions
        .get_by_token(&session.token)
        .unwrap_or(session);

    info!(
        username = %current.username,
        nodes = current.node_tokens.len(),
        "User logged in"
    );

    Ok(Json(LoginResponse {
        username: current.username,
        groups: current.groups,
        node_tokens: current.node_tokens,
        skipped: report.skipped,
    }))
}

/// GET /session - Current session
pub async fn current_session(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<GatewaySession>,
) -> Json<GatewaySession> {
    Json(state.sessions.get_by_token(&session.token).unwrap_or(session))
}

/// POST /logout - Unauthenticate from every node and drop the session
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<GatewaySession>,
) -> Result<Response, ApiError> {
    let failures = state.node_auth.unauthenticate_user_from_all(&session).await;
    state.sessions.remove(&session);

    info!(
        username = %session.username,
        failed_nodes = failures.len(),
        "User logged out"
    );
    Ok(StatusCode::NO_CONTENT.into_response())
}
