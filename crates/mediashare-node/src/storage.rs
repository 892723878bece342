//! File replication and sharing.
//!
//! Layout under the base directory:
//!
//! ```text
//! user/<name>/own/<file>
//! user/<name>/own/thumb/<file_thumb>
//! group/<name>/<file>
//! group/<name>/thumb/<file_thumb>
//! ```
//!
//! A share is a hard link from the user's own area into a group folder, so
//! every share is the same file as the original. Group folders are
//! provisioned by the operator; sharing into a missing one fails for that
//! group only.

use crate::{ErrorCode, NodeError, Result};
use bytes::Bytes;
use mediashare_core::{
    thumbnail_name, validate_segment, FailedShare, FilesGroupsMap, GroupId, THUMBNAIL_DIR,
};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Result of deleting a file
#[derive(Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Original, thumbnail and every share removed
    Deleted { unshared: Vec<GroupId> },
    /// A share could not be removed; the original was left in place
    Aborted(Vec<FailedShare>),
}

/// Node-local file store
#[derive(Clone, Debug)]
pub struct FileStore {
    base: PathBuf,
}

impl FileStore {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Root directory
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// `user/<name>/own`
    pub fn own_dir(&self, username: &str) -> PathBuf {
        self.base.join("user").join(username).join("own")
    }

    /// `group/<name>`
    pub fn group_dir(&self, group: &str) -> PathBuf {
        self.base.join("group").join(group)
    }

    /// Create the `user/` and `group/` roots and the given group folders
    pub async fn init(&self, groups: &[String]) -> Result<()> {
        fs::create_dir_all(self.base.join("user")).await?;
        fs::create_dir_all(self.base.join("group")).await?;
        for group in groups {
            validate_segment("group", group)?;
            fs::create_dir_all(self.group_dir(group).join(THUMBNAIL_DIR)).await?;
        }
        Ok(())
    }

    /// Store an original and its thumbnail in the user's own area.
    ///
    /// Both writes must succeed. A failed upload may leave a partial file
    /// behind. An existing original is never overwritten.
    pub async fn upload(
        &self,
        username: &str,
        filename: &str,
        original: Bytes,
        thumbnail: Bytes,
    ) -> Result<()> {
        validate_segment("username", username)?;
        validate_segment("filename", filename)?;
        let thumb = thumbnail_name(filename)?;

        let own = self.own_dir(username);
        fs::create_dir_all(own.join(THUMBNAIL_DIR)).await?;

        // Writing over an existing original would change every group link of it
        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(own.join(filename))
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(NodeError::new(
                    ErrorCode::Conflict,
                    format!("file {filename} already exists"),
                ));
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(&original).await?;
        file.flush().await?;

        // A leftover thumbnail may still be linked into a group
        let thumb_path = own.join(THUMBNAIL_DIR).join(&thumb);
        remove_if_present(&thumb_path).await?;
        fs::write(&thumb_path, &thumbnail).await?;

        info!(
            username,
            filename,
            size = original.len(),
            "File stored"
        );
        Ok(())
    }

    /// Link every (file, group) pair into the group folders.
    ///
    /// Returns the pairs that failed; the others are shared.
    pub async fn share(&self, username: &str, map: &FilesGroupsMap) -> Result<Vec<FailedShare>> {
        validate_segment("username", username)?;
        map.validate()?;

        let mut failed = Vec::new();
        for (filename, group) in map.pairs() {
            if let Err(reason) = self.share_one(username, filename, group).await {
                warn!(username, filename, group, reason = %reason, "Share failed");
                failed.push(FailedShare::new(filename, group, reason));
            }
        }
        Ok(failed)
    }

    /// Remove the group links of every (file, group) pair.
    ///
    /// Returns the pairs that failed; the others are unshared.
    pub async fn unshare(&self, username: &str, map: &FilesGroupsMap) -> Result<Vec<FailedShare>> {
        validate_segment("username", username)?;
        map.validate()?;

        let mut failed = Vec::new();
        for (filename, group) in map.pairs() {
            if let Err(reason) = self.unshare_one(username, filename, group).await {
                warn!(username, filename, group, reason = %reason, "Unshare failed");
                failed.push(FailedShare::new(filename, group, reason));
            }
        }
        Ok(failed)
    }

    /// Delete a file after removing all of its shares.
    ///
    /// If any share cannot be removed the original stays on disk, so no
    /// group keeps a link whose source is gone.
    pub async fn delete(&self, username: &str, filename: &str) -> Result<DeleteOutcome> {
        validate_segment("username", username)?;
        validate_segment("filename", filename)?;
        let thumb = thumbnail_name(filename)?;

        let own = self.own_dir(username);
        let original = own.join(filename);
        if !exists(&original).await? {
            return Err(NodeError::not_found(format!("file {filename}")));
        }

        let own_thumb = own.join(THUMBNAIL_DIR).join(&thumb);
        let groups = self.groups_sharing(&original, &own_thumb, filename, &thumb).await?;
        let mut failed = Vec::new();
        for group in &groups {
            if let Err(reason) = self.unshare_one(username, filename, group).await {
                warn!(username, filename, group = %group, reason = %reason, "Unshare before delete failed");
                failed.push(FailedShare::new(filename, group, reason));
            }
        }
        if !failed.is_empty() {
            return Ok(DeleteOutcome::Aborted(failed));
        }

        fs::remove_file(&original).await?;
        remove_if_present(&own_thumb).await?;

        info!(username, filename, shares = groups.len(), "File deleted");
        Ok(DeleteOutcome::Deleted { unshared: groups })
    }

    async fn share_one(&self, username: &str, filename: &str, group: &str) -> std::result::Result<(), String> {
        validate_segment("filename", filename).map_err(|e| e.to_string())?;
        validate_segment("group", group).map_err(|e| e.to_string())?;
        let thumb = thumbnail_name(filename).map_err(|e| e.to_string())?;

        let group_dir = self.group_dir(group);
        if !is_dir(&group_dir).await {
            return Err("group folder does not exist".to_string());
        }

        let own = self.own_dir(username);
        link(&own.join(filename), &group_dir.join(filename)).await?;

        let thumb_dir = group_dir.join(THUMBNAIL_DIR);
        fs::create_dir_all(&thumb_dir)
            .await
            .map_err(|e| format!("cannot create thumbnail folder: {e}"))?;
        link(&own.join(THUMBNAIL_DIR).join(&thumb), &thumb_dir.join(&thumb)).await?;

        debug!(username, filename, group, "File shared");
        Ok(())
    }

    async fn unshare_one(&self, username: &str, filename: &str, group: &str) -> std::result::Result<(), String> {
        validate_segment("filename", filename).map_err(|e| e.to_string())?;
        validate_segment("group", group).map_err(|e| e.to_string())?;
        let thumb = thumbnail_name(filename).map_err(|e| e.to_string())?;

        let own = self.own_dir(username);
        let group_dir = self.group_dir(group);
        let shared = group_dir.join(filename);
        let shared_thumb = group_dir.join(THUMBNAIL_DIR).join(&thumb);

        let original_linked = linked(&own.join(filename), &shared).await?;
        let thumb_linked = linked(&own.join(THUMBNAIL_DIR).join(&thumb), &shared_thumb).await?;

        // Original link goes last: while it exists the share stays discoverable
        if thumb_linked {
            fs::remove_file(&shared_thumb).await.map_err(|e| e.to_string())?;
        }
        if original_linked {
            fs::remove_file(&shared).await.map_err(|e| e.to_string())?;
        }

        debug!(username, filename, group, "File unshared");
        Ok(())
    }

    /// Groups holding a link of the original or of its thumbnail
    async fn groups_sharing(
        &self,
        original: &Path,
        own_thumb: &Path,
        filename: &str,
        thumb: &str,
    ) -> Result<Vec<GroupId>> {
        let mut groups = Vec::new();
        let mut entries = match fs::read_dir(self.base.join("group")).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(groups),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let Some(group) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let dir = entry.path();
            if is_link_of(original, &dir.join(filename)).await?
                || is_link_of(own_thumb, &dir.join(THUMBNAIL_DIR).join(thumb)).await?
            {
                groups.push(group);
            }
        }
        groups.sort();
        Ok(groups)
    }
}

/// Whether `shared` is a link of `own`; either path missing means no
async fn is_link_of(own: &Path, shared: &Path) -> std::io::Result<bool> {
    match same_file(own, shared).await {
        Ok(linked) => Ok(linked),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Whether `shared` is a link of `own` that may be removed.
///
/// Nothing at `shared` is fine. Anything else there that is not the user's
/// file is refused.
async fn linked(own: &Path, shared: &Path) -> std::result::Result<bool, String> {
    const FOREIGN: &str = "shared file is not a link of this user's file";
    match same_file(own, shared).await {
        Ok(true) => Ok(true),
        Ok(false) => Err(FOREIGN.to_string()),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            if exists(shared).await.unwrap_or(false) {
                Err(FOREIGN.to_string())
            } else {
                Ok(false)
            }
        }
        Err(e) => Err(e.to_string()),
    }
}

/// Hard link `source` to `target`; an existing link of the same file is kept
async fn link(source: &Path, target: &Path) -> std::result::Result<(), String> {
    match fs::hard_link(source, target).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => match same_file(source, target).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(format!("{} already exists", file_label(target))),
            Err(e) => Err(e.to_string()),
        },
        Err(e) if e.kind() == ErrorKind::NotFound => {
            Err(format!("{} does not exist", file_label(source)))
        }
        Err(e) => Err(e.to_string()),
    }
}

/// Check whether two paths are links of the same file
pub async fn same_file(a: &Path, b: &Path) -> std::io::Result<bool> {
    let a = fs::metadata(a).await?;
    let b = fs::metadata(b).await?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        Ok(a.dev() == b.dev() && a.ino() == b.ino())
    }

    #[cfg(not(unix))]
    {
        Ok(a.len() == b.len() && a.modified().ok() == b.modified().ok())
    }
}

async fn exists(path: &Path) -> std::io::Result<bool> {
    fs::try_exists(path).await
}

async fn is_dir(path: &Path) -> bool {
    fs::metadata(path).await.is_ok_and(|m| m.is_dir())
}

async fn remove_if_present(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path).await {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
