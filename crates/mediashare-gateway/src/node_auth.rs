//! Node authentication protocol, gateway side.
//!
//! Two directions:
//!
//! - a node proves its identity by presenting its pre-shared secret
//!   ([`NodeAuthenticator::register_node`]);
//! - the gateway authorizes a user on a node by minting a per-node token
//!   and pushing it with the node's secret as bearer credential
//!   ([`NodeAuthenticator::authenticate_user`]).
//!
//! Outbound calls never run under the session lock; tokens are recorded
//! after the round trip completes.

use crate::{ApiError, ErrorCode, GatewaySession, NodeRegistry, SessionStore};
use futures::future::join_all;
use mediashare_client::{ClientConfig, ClientError, NodeClient};
use mediashare_core::{generate_token, secrets_match, MetadataStore, Node, NodeId};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Why a node was left out of a bulk authentication
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    /// The user is neither creator nor member of one of the node's groups
    NotPermitted,
    /// No secret is known for the node
    MissingSecret,
    /// The node answered 404
    Unreachable,
    /// The node did not answer within the timeout
    TimedOut,
    /// The node refused with another status
    Rejected(String),
}

/// A node left out of a bulk authentication
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SkippedNode {
    pub node_id: NodeId,
    pub reason: SkipReason,
}

/// Outcome of authenticating a user to many nodes
#[derive(Clone, Debug, Default, Serialize)]
pub struct NodeAuthReport {
    /// Nodes the user now holds a token for
    pub authenticated: Vec<NodeId>,
    /// Nodes skipped, each with its reason
    pub skipped: Vec<SkippedNode>,
}

/// Drives both directions of the node trust handshake
#[derive(Clone)]
pub struct NodeAuthenticator {
    registry: NodeRegistry,
    sessions: SessionStore,
    store: Arc<dyn MetadataStore>,
    client_config: ClientConfig,
}

impl NodeAuthenticator {
    pub fn new(
        registry: NodeRegistry,
        sessions: SessionStore,
        store: Arc<dyn MetadataStore>,
        timeout: Duration,
    ) -> Self {
        Self {
            registry,
            sessions,
            store,
            client_config: ClientConfig::default().with_timeout(timeout),
        }
    }

    /// Check a node's presented secret and register it on success.
    ///
    /// Every failure, including an unknown id or a store error, yields the
    /// same generic error so callers cannot probe which ids exist.
    pub async fn register_node(&self, node_id: &str, presented: &str) -> Result<Node, ApiError> {
        self.registry.begin(node_id);

        let node = match self.store.find_node(node_id).await {
            Ok(node) => node,
            Err(e) => {
                error!(node_id, error = %e, "Node lookup failed during registration");
                None
            }
        };

        match node {
            Some(node) if secrets_match(&node.secret, presented) => {
                info!(node_id, "Node authenticated");
                self.registry.confirm(node.clone());
                Ok(node)
            }
            _ => {
                let previous = self.registry.reject(node_id);
                warn!(node_id, ?previous, "Node authentication rejected");
                Err(ApiError::new(
                    ErrorCode::AuthenticationFailed,
                    "could not authenticate",
                ))
            }
        }
    }

    /// Client for a node, authenticating with the node's secret
    pub fn client_for(&self, node: &Node) -> Result<NodeClient, ClientError> {
        NodeClient::new(&node.api_url, node.secret.clone(), self.client_config.clone())
    }

    /// Mint a token for `session`'s user on `node` and push it to the node.
    ///
    /// The token is recorded in the session store once the node accepted it.
    pub async fn authenticate_user(
        &self,
        session: &GatewaySession,
        node: &Node,
    ) -> Result<String, ClientError> {
        let token = generate_token();
        self.client_for(node)?
            .authenticate_user(&session.username, &token)
            .await?;

        if !self
            .sessions
            .set_node_token(&session.token, &node.id, token.clone())
        {
            debug!(username = %session.username, node_id = %node.id, "Session ended during node authentication");
        }
        Ok(token)
    }

    /// Token of `session` for `node`, authenticating on demand
    pub async fn ensure_token(
        &self,
        session: &GatewaySession,
        node: &Node,
    ) -> Result<String, ApiError> {
        if let Some(token) = self
            .sessions
            .get_by_token(&session.token)
            .and_then(|s| s.node_token(&node.id).map(str::to_string))
        {
            return Ok(token);
        }
        if let Some(reason) = skip_reason(session, node) {
            return Err(ApiError::new(
                ErrorCode::AccessDenied,
                format!("node {} is not usable: {reason:?}", node.id),
            ));
        }
        Ok(self.authenticate_user(session, node).await?)
    }

    /// Authenticate the user to every registered node they may use.
    ///
    /// Nodes are contacted concurrently. A 404, a timeout or another refusal
    /// skips the node and is reported; a transport failure (the node could
    /// not be reached at all) fails the whole batch.
    pub async fn authenticate_user_to_all(
        &self,
        session: &GatewaySession,
    ) -> Result<NodeAuthReport, ApiError> {
        let mut report = NodeAuthReport::default();
        let mut attempts = Vec::new();

        for node in self.registry.authenticated() {
            match skip_reason(session, &node) {
                Some(reason) => report.skipped.push(SkippedNode {
                    node_id: node.id,
                    reason,
                }),
                None => attempts.push(node),
            }
        }

        let results = join_all(attempts.iter().map(|node| self.authenticate_user(session, node))).await;

        let mut fatal = None;
        for (node, result) in attempts.into_iter().zip(results) {
            let reason = match result {
                Ok(_) => {
                    report.authenticated.push(node.id);
                    continue;
                }
                Err(e) if e.is_not_found() => {
                    warn!(node_id = %node.id, endpoint = %node.api_url, "Node unreachable, skipping");
                    SkipReason::Unreachable
                }
                Err(e) if e.is_timeout() => {
                    warn!(node_id = %node.id, endpoint = %node.api_url, "Node timed out, skipping");
                    SkipReason::TimedOut
                }
                Err(e) if e.is_transport() => {
                    error!(node_id = %node.id, endpoint = %node.api_url, error = %e, "Node transport failure");
                    fatal.get_or_insert((node.id, e));
                    continue;
                }
                Err(e) => {
                    warn!(node_id = %node.id, status = ?e.status(), error = %e, "Node refused user authentication");
                    SkipReason::Rejected(e.to_string())
                }
            };
            report.skipped.push(SkippedNode {
                node_id: node.id,
                reason,
            });
        }

        if let Some((node_id, e)) = fatal {
            return Err(ApiError::new(
                ErrorCode::NodeUnavailable,
                format!("could not reach node {node_id}: {e}"),
            ));
        }

        info!(
            username = %session.username,
            authenticated = report.authenticated.len(),
            skipped = report.skipped.len(),
            "User authenticated to nodes"
        );
        Ok(report)
    }

    /// Revoke the user's session on every node in the token map.
    ///
    /// Best effort; returns the nodes that could not be reached.
    pub async fn unauthenticate_user_from_all(
        &self,
        session: &GatewaySession,
    ) -> Vec<(NodeId, String)> {
        let node_ids: Vec<NodeId> = self
            .sessions
            .get_by_token(&session.token)
            .unwrap_or_else(|| session.clone())
            .node_tokens
            .into_keys()
            .collect();

        let calls = node_ids.into_iter().map(|node_id| async move {
            let outcome = self.unauthenticate_user(session, &node_id).await;
            (node_id, outcome)
        });

        let mut failures = Vec::new();
        for (node_id, outcome) in join_all(calls).await {
            self.sessions.remove_node_token(&session.token, &node_id);
            if let Err(e) = outcome {
                warn!(node_id = %node_id, username = %session.username, error = %e, "Node unauthentication failed");
                failures.push((node_id, e.to_string()));
            }
        }
        failures
    }

    async fn unauthenticate_user(
        &self,
        session: &GatewaySession,
        node_id: &str,
    ) -> Result<(), ApiError> {
        let node = match self.registry.get(node_id) {
            Some(node) => node,
            None => self
                .store
                .find_node(node_id)
                .await?
                .ok_or_else(|| ApiError::not_found(format!("node {node_id}")))?,
        };
        self.client_for(&node)?
            .unauthenticate_user(&session.username)
            .await?;
        Ok(())
    }
}

fn skip_reason(session: &GatewaySession, node: &Node) -> Option<SkipReason> {
    if !node.is_accessible_by(&session.username, &session.groups) {
        Some(SkipReason::NotPermitted)
    } else if node.secret.is_empty() {
        Some(SkipReason::MissingSecret)
    } else {
        None
    }
}
