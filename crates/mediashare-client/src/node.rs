//! Gateway-to-node client

use crate::{
    types::{SESSION_TOKEN_HEADER, UPLOAD_FILE_FIELD, UPLOAD_THUMB_FIELD},
    ClientConfig, ClientError, Result,
};
use bytes::Bytes;
use mediashare_core::{thumbnail_name, FilesGroupsMap};
use reqwest::{header, multipart, Client, RequestBuilder, Response};
use tracing::{debug, instrument};

/// Client for one storage node's control-plane API
#[derive(Clone)]
pub struct NodeClient {
    base_url: String,
    secret: String,
    http: Client,
}

impl NodeClient {
    /// Create a client for the node at `base_url` using the node's shared secret
    pub fn new(
        base_url: impl AsRef<str>,
        secret: impl Into<String>,
        config: ClientConfig,
    ) -> Result<Self> {
        let base_url = url::Url::parse(base_url.as_ref())
            .map_err(|e| ClientError::Config(format!("invalid node URL: {e}")))?;

        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .build()?;

        Ok(Self {
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
            secret: secret.into(),
            http,
        })
    }

    /// Node base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Authorize `username` on the node with a freshly minted token
    #[instrument(skip(self, token), fields(node = %self.base_url))]
    pub async fn authenticate_user(&self, username: &str, token: &str) -> Result<()> {
        let url = format!("{}/user/{}/authenticate", self.base_url, seg(username));
        let request = self.http.post(url).json(&token);
        self.send(request).await?;
        Ok(())
    }

    /// Revoke `username`'s session on the node
    #[instrument(skip(self), fields(node = %self.base_url))]
    pub async fn unauthenticate_user(&self, username: &str) -> Result<()> {
        let url = format!("{}/user/{}/unauthenticate", self.base_url, seg(username));
        self.send(self.http.post(url)).await?;
        Ok(())
    }

    /// Upload an original and its thumbnail into `username`'s own area
    #[instrument(skip(self, session_token, original, thumbnail), fields(node = %self.base_url, size = original.len()))]
    pub async fn upload_file(
        &self,
        username: &str,
        session_token: &str,
        filename: &str,
        original: Bytes,
        thumbnail: Bytes,
    ) -> Result<()> {
        let thumb_name = thumbnail_name(filename)
            .map_err(|e| ClientError::Config(e.to_string()))?;
        let form = multipart::Form::new()
            .part(
                UPLOAD_FILE_FIELD,
                multipart::Part::stream(original).file_name(filename.to_string()),
            )
            .part(
                UPLOAD_THUMB_FIELD,
                multipart::Part::stream(thumbnail).file_name(thumb_name),
            );

        let url = format!("{}/file/{}", self.base_url, seg(username));
        let request = self
            .http
            .post(url)
            .header(SESSION_TOKEN_HEADER, session_token)
            .multipart(form);
        self.send(request).await?;
        Ok(())
    }

    /// Delete a file (and all of its group shares) from `username`'s area
    #[instrument(skip(self, session_token), fields(node = %self.base_url))]
    pub async fn delete_file(
        &self,
        username: &str,
        session_token: &str,
        filename: &str,
    ) -> Result<()> {
        let url = format!("{}/file/{}/{}", self.base_url, seg(username), seg(filename));
        let request = self
            .http
            .delete(url)
            .header(SESSION_TOKEN_HEADER, session_token);
        self.send(request).await?;
        Ok(())
    }

    /// Share files with groups. Partial failures surface as
    /// [`ClientError::PartialFailure`].
    #[instrument(skip(self, session_token, map), fields(node = %self.base_url))]
    pub async fn share_files(
        &self,
        username: &str,
        session_token: &str,
        map: &FilesGroupsMap,
    ) -> Result<()> {
        let url = format!("{}/files/{}/shares", self.base_url, seg(username));
        let request = self
            .http
            .post(url)
            .header(SESSION_TOKEN_HEADER, session_token)
            .json(map);
        self.send(request).await?;
        Ok(())
    }

    /// Remove group shares of files
    #[instrument(skip(self, session_token, map), fields(node = %self.base_url))]
    pub async fn unshare_files(
        &self,
        username: &str,
        session_token: &str,
        map: &FilesGroupsMap,
    ) -> Result<()> {
        let url = format!("{}/files/{}/shares/remove", self.base_url, seg(username));
        let request = self
            .http
            .post(url)
            .header(SESSION_TOKEN_HEADER, session_token)
            .json(map);
        self.send(request).await?;
        Ok(())
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request
            .header(header::AUTHORIZATION, format!("Bearer {}", self.secret))
            .send()
            .await?;

        let status = response.status();
        debug!(status = status.as_u16(), "Node responded");
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ClientError::from_response(status, &body))
    }
}

fn seg(value: &str) -> std::borrow::Cow<'_, str> {
    urlencoding::encode(value)
}
