//! Media metadata, upload forwarding, and sharing

use crate::{ApiError, AppState, ErrorCode, GatewaySession};
use axum::{
    extract::{Extension, Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use mediashare_client::{ClientError, UPLOAD_FILE_FIELD, UPLOAD_THUMB_FIELD};
use mediashare_core::{
    thumbnail_name, validate_segment, FailedShare, FilesGroupsMap, GroupId, MediaQuery,
    MediaRecord, Node, NodeQuery, THUMBNAIL_DIR,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};

/// A media record with the caller's file URLs
#[derive(Debug, Serialize, Deserialize)]
pub struct MediaView {
    #[serde(flatten)]
    pub record: MediaRecord,
    /// Original, present once the caller holds a token for the node
    pub url: Option<String>,
    /// Thumbnail, present once the caller holds a token for the node
    pub thumbnail_url: Option<String>,
}

impl MediaView {
    /// Build the view, substituting the caller's token for the record's node
    pub fn new(record: MediaRecord, session: &GatewaySession, node: Option<&Node>) -> Self {
        let links = node
            .zip(session.node_token(&record.node_id))
            .and_then(|(node, token)| media_links(&record, session, node, token));
        let (url, thumbnail_url) = match links {
            Some((url, thumb)) => (Some(url), thumb),
            None => (None, None),
        };
        Self {
            record,
            url,
            thumbnail_url,
        }
    }
}

/// `<data_url>/<token>/own/<file>` for the creator,
/// `<data_url>/<token>/group/<group>/<file>` for group members
fn media_links(
    record: &MediaRecord,
    session: &GatewaySession,
    node: &Node,
    token: &str,
) -> Option<(String, Option<String>)> {
    let area = if record.creator == session.username {
        "own".to_string()
    } else {
        let group = record.groups.intersection(&session.groups).next()?;
        format!("group/{group}")
    };
    let base = format!("{}/{token}/{area}", node.data_url.trim_end_matches('/'));
    let thumb = thumbnail_name(&record.filename)
        .ok()
        .map(|name| format!("{base}/{THUMBNAIL_DIR}/{name}"));
    Some((format!("{base}/{}", record.filename), thumb))
}

/// Query parameters of GET /media
#[derive(Debug, Default, Deserialize)]
pub struct ListMediaParams {
    #[serde(default)]
    pub owner_only: bool,
    pub node_id: Option<String>,
}

/// GET /media - Media visible to the caller
pub async fn list_media(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<GatewaySession>,
    Query(params): Query<ListMediaParams>,
) -> Result<Json<Vec<MediaView>>, ApiError> {
    let mut query = MediaQuery::new().with_permission(session.permission(params.owner_only));
    if let Some(node_id) = params.node_id {
        query = query.on_node(node_id);
    }

    let session = current(&state, session);
    let records = state.store_call(state.store.query_media(&query)).await?;
    let views = records
        .into_iter()
        .map(|record| {
            let node = state.registry.get(&record.node_id);
            MediaView::new(record, &session, node.as_ref())
        })
        .collect();

    Ok(Json(views))
}

/// GET /media/{id} - One media record
pub async fn get_media(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<GatewaySession>,
    Path(media_id): Path<String>,
) -> Result<Json<MediaView>, ApiError> {
    let record = find_media(&state, &session, &media_id, false).await?;
    let session = current(&state, session);
    let node = state.registry.get(&record.node_id);
    Ok(Json(MediaView::new(record, &session, node.as_ref())))
}

/// Result of an upload
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub media: MediaView,
    /// Requested shares that could not be created
    pub failed: Vec<FailedShare>,
}

/// POST /media/{node_id} - Upload an original and its thumbnail to a node.
///
/// Fields: `uploadfile`, `uploadthumb`, optional `groups` (comma separated).
/// The record is registered once the node stored both files; requested
/// shares are then created best effort.
pub async fn upload_media(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<GatewaySession>,
    Path(node_id): Path<String>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let upload = UploadForm::parse(multipart).await?;
    validate_segment("filename", &upload.filename)?;
    thumbnail_name(&upload.filename)?;

    let query = NodeQuery::new()
        .with_id(node_id.clone())
        .with_permission(session.permission(false));
    state
        .store_call(state.store.get_node(&query))
        .await?
        .ok_or_else(|| ApiError::not_found(format!("node {node_id}")))?;
    let node = registered_node(&state, &node_id)?;

    // A second record for the same file would alias the first one
    let own_on_node = MediaQuery::new()
        .on_node(node_id.clone())
        .with_permission(session.permission(true));
    let existing = state.store_call(state.store.query_media(&own_on_node)).await?;
    if existing.iter().any(|r| r.filename == upload.filename) {
        return Err(ApiError::new(
            ErrorCode::Conflict,
            format!("{} already exists on node {node_id}", upload.filename),
        ));
    }

    let token = state.node_auth.ensure_token(&session, &node).await?;
    state
        .node_auth
        .client_for(&node)?
        .upload_file(
            &session.username,
            &token,
            &upload.filename,
            upload.original,
            upload.thumbnail,
        )
        .await?;

    let record = MediaRecord::new(&node_id, &session.username, &upload.filename);
    state.store_call(state.store.insert_media(record.clone())).await?;
    info!(
        media_id = %record.id,
        node_id = %node_id,
        filename = %record.filename,
        "Media uploaded"
    );

    let (record, failed) = if upload.groups.is_empty() {
        (record, Vec::new())
    } else {
        match apply_shares(&state, &session, &node, record.clone(), upload.groups.clone(), true).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(media_id = %record.id, error = %e, "Sharing after upload failed");
                let failed = upload
                    .groups
                    .iter()
                    .map(|g| FailedShare::new(&record.filename, g, e.to_string()))
                    .collect();
                (record, failed)
            }
        }
    };

    let session = current(&state, session);
    let media = MediaView::new(record, &session, Some(&node));
    Ok((StatusCode::CREATED, Json(UploadResponse { media, failed })).into_response())
}

/// Body of the share endpoints
#[derive(Debug, Deserialize)]
pub struct SharesRequest {
    pub groups: BTreeSet<GroupId>,
}

/// POST /media/{id}/shares - Share one of the caller's media with groups
pub async fn share_media(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<GatewaySession>,
    Path(media_id): Path<String>,
    Json(body): Json<SharesRequest>,
) -> Result<Response, ApiError> {
    change_shares(state, session, media_id, body.groups, true).await
}

/// POST /media/{id}/shares/remove - Stop sharing one of the caller's media
pub async fn unshare_media(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<GatewaySession>,
    Path(media_id): Path<String>,
    Json(body): Json<SharesRequest>,
) -> Result<Response, ApiError> {
    change_shares(state, session, media_id, body.groups, false).await
}

async fn change_shares(
    state: Arc<AppState>,
    session: GatewaySession,
    media_id: String,
    groups: BTreeSet<GroupId>,
    share: bool,
) -> Result<Response, ApiError> {
    let record = find_media(&state, &session, &media_id, true).await?;
    let node = registered_node(&state, &record.node_id)?;

    let (record, failed) = apply_shares(&state, &session, &node, record, groups, share).await?;
    if !failed.is_empty() {
        return Err(ApiError::PartialFailure(failed));
    }

    let session = current(&state, session);
    Ok(Json(MediaView::new(record, &session, Some(&node))).into_response())
}

/// Push a share change to the node and record the groups that succeeded
async fn apply_shares(
    state: &AppState,
    session: &GatewaySession,
    node: &Node,
    record: MediaRecord,
    groups: BTreeSet<GroupId>,
    share: bool,
) -> Result<(MediaRecord, Vec<FailedShare>), ApiError> {
    let map = FilesGroupsMap::new(
        vec![record.filename.clone()],
        groups.iter().cloned().collect(),
    );
    map.validate()?;

    let token = state.node_auth.ensure_token(session, node).await?;
    let client = state.node_auth.client_for(node)?;
    let result = if share {
        client.share_files(&session.username, &token, &map).await
    } else {
        client.unshare_files(&session.username, &token, &map).await
    };

    let failed = match result {
        Ok(()) => Vec::new(),
        Err(ClientError::PartialFailure(failed)) => failed,
        Err(e) => return Err(e.into()),
    };

    let failed_groups: BTreeSet<&GroupId> = failed.iter().map(|f| &f.group).collect();
    let done = groups.iter().filter(|g| !failed_groups.contains(g));
    let mut updated = record.groups.clone();
    for group in done {
        if share {
            updated.insert(group.clone());
        } else {
            updated.remove(group);
        }
    }

    let query = MediaQuery::new()
        .with_id(record.id.clone())
        .with_permission(session.permission(true));
    let record = state
        .store_call(state.store.update_media_groups(&query, updated))
        .await?;

    info!(
        media_id = %record.id,
        share,
        failed = failed.len(),
        "Media shares updated"
    );
    Ok((record, failed))
}

/// DELETE /media/{id} - Delete one of the caller's media.
///
/// The record is removed only after the node removed the file; an aborted
/// node delete answers 409 with the shares that could not be removed.
pub async fn delete_media(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<GatewaySession>,
    Path(media_id): Path<String>,
) -> Result<Response, ApiError> {
    let record = find_media(&state, &session, &media_id, true).await?;
    let node = registered_node(&state, &record.node_id)?;

    let token = state.node_auth.ensure_token(&session, &node).await?;
    match state
        .node_auth
        .client_for(&node)?
        .delete_file(&session.username, &token, &record.filename)
        .await
    {
        Ok(()) => {}
        Err(e) if e.is_not_found() => {
            warn!(media_id = %record.id, "File already gone from node");
        }
        Err(e) => return Err(e.into()),
    }

    let query = MediaQuery::new()
        .with_id(record.id.clone())
        .with_permission(session.permission(true));
    state.store_call(state.store.delete_media(&query)).await?;
    info!(media_id = %record.id, "Media deleted");

    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn find_media(
    state: &AppState,
    session: &GatewaySession,
    media_id: &str,
    owner_only: bool,
) -> Result<MediaRecord, ApiError> {
    let query = MediaQuery::new()
        .with_id(media_id)
        .with_permission(session.permission(owner_only));
    state
        .store_call(state.store.get_media(&query))
        .await?
        .ok_or_else(|| ApiError::not_found(format!("media {media_id}")))
}

fn registered_node(state: &AppState, node_id: &str) -> Result<Node, ApiError> {
    state.registry.get(node_id).ok_or_else(|| {
        ApiError::new(
            ErrorCode::NodeUnavailable,
            format!("node {node_id} has not registered with the gateway"),
        )
    })
}

/// Latest copy of the session, with node tokens minted during this request
fn current(state: &AppState, session: GatewaySession) -> GatewaySession {
    state.sessions.get_by_token(&session.token).unwrap_or(session)
}

struct UploadForm {
    filename: String,
    original: Bytes,
    thumbnail: Bytes,
    groups: BTreeSet<GroupId>,
}

impl UploadForm {
    async fn parse(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut original = None;
        let mut thumbnail = None;
        let mut groups = BTreeSet::new();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::invalid(format!("malformed multipart body: {e}")))?
        {
            let name = field.name().unwrap_or_default().to_string();
            let file_name = field.file_name().map(str::to_string);
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::invalid(format!("unreadable field {name}: {e}")))?;

            match name.as_str() {
                UPLOAD_FILE_FIELD => {
                    let file_name = file_name
                        .ok_or_else(|| ApiError::invalid("uploadfile has no file name"))?;
                    original = Some((file_name, data));
                }
                UPLOAD_THUMB_FIELD => thumbnail = Some(data),
                "groups" => {
                    let text = String::from_utf8_lossy(&data);
                    groups.extend(
                        text.split(',')
                            .map(str::trim)
                            .filter(|g| !g.is_empty())
                            .map(str::to_string),
                    );
                }
                _ => {}
            }
        }

        let (filename, original) =
            original.ok_or_else(|| ApiError::invalid("missing uploadfile field"))?;
        let thumbnail = thumbnail.ok_or_else(|| ApiError::invalid("missing uploadthumb field"))?;

        Ok(Self {
            filename,
            original,
            thumbnail,
            groups,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Identity;
    use chrono::{Duration, Utc};

    fn session(username: &str, groups: &[&str]) -> GatewaySession {
        let identity = Identity {
            username: username.to_string(),
            expires_at: Utc::now() + Duration::hours(1),
        };
        let mut session = GatewaySession::new(
            identity,
            "bearer",
            groups.iter().map(|g| g.to_string()).collect(),
        );
        session.node_tokens.insert("n1".into(), "tok".into());
        session
    }

    fn node() -> Node {
        Node::new("n1", "Home", "alice", "http://api", "http://data/")
    }

    #[test]
    fn test_own_media_links() {
        let record = MediaRecord::new("n1", "alice", "f.jpg");
        let view = MediaView::new(record, &session("alice", &[]), Some(&node()));
        assert_eq!(view.url.as_deref(), Some("http://data/tok/own/f.jpg"));
        assert_eq!(
            view.thumbnail_url.as_deref(),
            Some("http://data/tok/own/thumb/f_thumb.jpg")
        );
    }

    #[test]
    fn test_group_media_links() {
        let record = MediaRecord::new("n1", "bob", "f.jpg").with_group("family");
        let view = MediaView::new(record, &session("alice", &["family"]), Some(&node()));
        assert_eq!(view.url.as_deref(), Some("http://data/tok/group/family/f.jpg"));
        assert_eq!(
            view.thumbnail_url.as_deref(),
            Some("http://data/tok/group/family/thumb/f_thumb.jpg")
        );
    }

    #[test]
    fn test_no_links_without_token() {
        let record = MediaRecord::new("n2", "alice", "f.jpg");
        let view = MediaView::new(record, &session("alice", &[]), Some(&node()));
        assert!(view.url.is_none());
        assert!(view.thumbnail_url.is_none());
    }
}
