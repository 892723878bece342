//! Wire types shared by the gateway and the nodes

use mediashare_core::FailedShare;
use serde::{Deserialize, Serialize};

/// Header carrying the per-user node token on file operations
pub const SESSION_TOKEN_HEADER: &str = "x-session-token";

/// Multipart field holding the original file
pub const UPLOAD_FILE_FIELD: &str = "uploadfile";

/// Multipart field holding the thumbnail
pub const UPLOAD_THUMB_FIELD: &str = "uploadthumb";

/// Body of a partially failed share, unshare, or delete
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareFailures {
    pub failed: Vec<FailedShare>,
}

/// JSON error body returned by the gateway and the nodes
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub request_id: Option<String>,
}
