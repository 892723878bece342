//! Upload, delete, and share files

use crate::middleware::require_user_session;
use crate::storage::DeleteOutcome;
use crate::{NodeError, NodeState};
use axum::{
    extract::{Multipart, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use mediashare_client::{UPLOAD_FILE_FIELD, UPLOAD_THUMB_FIELD};
use mediashare_core::FilesGroupsMap;
use std::sync::Arc;

/// POST /file/{username} - Store an original and its thumbnail
pub async fn upload_file(
    State(state): State<Arc<NodeState>>,
    Path(username): Path<String>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Response, NodeError> {
    require_user_session(&state, &headers, &username)?;

    let mut original: Option<(String, Bytes)> = None;
    let mut thumbnail: Option<Bytes> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| NodeError::invalid(format!("malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| NodeError::invalid(format!("unreadable field {name}: {e}")))?;

        match name.as_str() {
            UPLOAD_FILE_FIELD => {
                let file_name =
                    file_name.ok_or_else(|| NodeError::invalid("uploadfile has no file name"))?;
                original = Some((file_name, data));
            }
            UPLOAD_THUMB_FIELD => thumbnail = Some(data),
            _ => {}
        }
    }

    let (filename, original) =
        original.ok_or_else(|| NodeError::invalid("missing uploadfile field"))?;
    let thumbnail = thumbnail.ok_or_else(|| NodeError::invalid("missing uploadthumb field"))?;

    state
        .files
        .upload(&username, &filename, original, thumbnail)
        .await?;
    Ok(StatusCode::CREATED.into_response())
}

/// DELETE /file/{username}/{filename} - Delete a file and all its shares
pub async fn delete_file(
    State(state): State<Arc<NodeState>>,
    Path((username, filename)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, NodeError> {
    require_user_session(&state, &headers, &username)?;

    match state.files.delete(&username, &filename).await? {
        DeleteOutcome::Deleted { .. } => Ok(StatusCode::NO_CONTENT.into_response()),
        DeleteOutcome::Aborted(failed) => Err(NodeError::PartialFailure(failed)),
    }
}

/// POST /files/{username}/shares - Share files with groups
pub async fn share_files(
    State(state): State<Arc<NodeState>>,
    Path(username): Path<String>,
    headers: HeaderMap,
    Json(map): Json<FilesGroupsMap>,
) -> Result<Response, NodeError> {
    require_user_session(&state, &headers, &username)?;

    let failed = state.files.share(&username, &map).await?;
    if !failed.is_empty() {
        return Err(NodeError::PartialFailure(failed));
    }
    Ok(StatusCode::CREATED.into_response())
}

/// POST /files/{username}/shares/remove - Remove group shares of files
pub async fn unshare_files(
    State(state): State<Arc<NodeState>>,
    Path(username): Path<String>,
    headers: HeaderMap,
    Json(map): Json<FilesGroupsMap>,
) -> Result<Response, NodeError> {
    require_user_session(&state, &headers, &username)?;

    let failed = state.files.unshare(&username, &map).await?;
    if !failed.is_empty() {
        return Err(NodeError::PartialFailure(failed));
    }
    Ok(StatusCode::OK.into_response())
}
