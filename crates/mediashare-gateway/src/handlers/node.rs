//! Node registration and node management

use crate::{ApiError, AppState, GatewaySession, NodeState};
use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mediashare_core::{
    generate_secret, validate_segment, GroupId, Node, NodeKind, NodeQuery, NodeView,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::info;

/// POST /node/{id}/authenticate - Node presents its pre-shared secret
pub async fn authenticate_node(
    State(state): State<Arc<AppState>>,
    Path(node_id): Path<String>,
    secret: String,
) -> Result<Response, ApiError> {
    state.node_auth.register_node(&node_id, &secret).await?;
    Ok((StatusCode::OK, "OK").into_response())
}

/// A node as listed to a user
#[derive(Debug, Serialize)]
pub struct NodeListing {
    #[serde(flatten)]
    pub node: NodeView,
    pub state: NodeState,
}

/// GET /nodes - Nodes the caller may use
pub async fn list_nodes(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<GatewaySession>,
) -> Result<Json<Vec<NodeListing>>, ApiError> {
    let query = NodeQuery::new().with_permission(session.permission(false));
    let nodes = state.store_call(state.store.query_nodes(&query)).await?;

    Ok(Json(
        nodes
            .iter()
            .map(|node| NodeListing {
                node: node.view_for(&session.username),
                state: state.registry.state(&node.id),
            })
            .collect(),
    ))
}

/// Body of POST /nodes
#[derive(Debug, Deserialize)]
pub struct CreateNodeRequest {
    /// Defaults to a fresh UUID
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub kind: NodeKind,
    #[serde(default)]
    pub groups: BTreeSet<GroupId>,
    pub api_url: String,
    pub data_url: String,
}

/// POST /nodes - Create a node owned by the caller
pub async fn create_node(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<GatewaySession>,
    Json(body): Json<CreateNodeRequest>,
) -> Result<Response, ApiError> {
    let id = body
        .id
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    validate_segment("node id", &id)?;
    if body.title.trim().is_empty() {
        return Err(ApiError::invalid("title must not be empty"));
    }

    let mut node = Node::new(id, body.title, &session.username, body.api_url, body.data_url)
        .with_kind(body.kind);
    node.groups = body.groups;

    state.store_call(state.store.insert_node(node.clone())).await?;
    info!(node_id = %node.id, creator = %node.creator, "Node created");

    Ok((StatusCode::CREATED, Json(node.view_for(&session.username))).into_response())
}

/// DELETE /node/{id} - Delete one of the caller's nodes
pub async fn delete_node(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<GatewaySession>,
    Path(node_id): Path<String>,
) -> Result<Response, ApiError> {
    let query = NodeQuery::new()
        .with_id(node_id.clone())
        .with_permission(session.permission(true));

    state
        .store_call(state.store.delete_node(&query))
        .await?
        .ok_or_else(|| ApiError::not_found(format!("node {node_id}")))?;

    state.registry.remove(&node_id);
    state.sessions.forget_node(&node_id);
    info!(node_id = %node_id, "Node deleted");

    Ok(StatusCode::NO_CONTENT.into_response())
}

/// Node secret as returned to its owner
#[derive(Debug, Serialize, Deserialize)]
pub struct NodeSecret {
    pub secret: String,
}

/// GET /node/{id}/secret - Read one of the caller's node secrets
pub async fn get_node_secret(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<GatewaySession>,
    Path(node_id): Path<String>,
) -> Result<Json<NodeSecret>, ApiError> {
    let query = NodeQuery::new()
        .with_id(node_id.clone())
        .with_permission(session.permission(true));

    let node = state
        .store_call(state.store.get_node(&query))
        .await?
        .ok_or_else(|| ApiError::not_found(format!("node {node_id}")))?;

    Ok(Json(NodeSecret {
        secret: node.secret,
    }))
}

/// POST /node/{id}/secret - Replace one of the caller's node secrets.
///
/// The node leaves the registry until it registers with the new secret.
pub async fn refresh_node_secret(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<GatewaySession>,
    Path(node_id): Path<String>,
) -> Result<Json<NodeSecret>, ApiError> {
    let query = NodeQuery::new()
        .with_id(node_id.clone())
        .with_permission(session.permission(true));

    let node = state
        .store_call(state.store.update_node_secret(&query, generate_secret()))
        .await?;

    state.registry.remove(&node_id);
    state.sessions.forget_node(&node_id);
    info!(node_id = %node_id, "Node secret refreshed");

    Ok(Json(NodeSecret {
        secret: node.secret,
    }))
}
