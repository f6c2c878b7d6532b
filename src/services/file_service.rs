//! Client for the hosted file-manager API.
//!
//! Each operation maps to one upstream endpoint and hands back the upstream
//! JSON payload untouched. There are no retries; failures surface as
//! [`UpstreamError`] carrying whatever status and body the upstream sent.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("file service unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("file service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("file service returned malformed JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("invalid file service URL")]
    InvalidUrl,
}

impl UpstreamError {
    /// HTTP status reported by the upstream, when it answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            UpstreamError::Status { status, .. } => Some(*status),
            UpstreamError::Transport(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

pub type UpstreamResult = Result<Value, UpstreamError>;

/// Reads an identifier out of an upstream payload. The service reports ids
/// as strings or as bare numbers depending on the endpoint.
pub fn id_field(payload: &Value, key: &str) -> Option<String> {
    match payload.get(key)? {
        Value::String(id) if !id.trim().is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

#[async_trait]
pub trait FileService: Send + Sync {
    async fn list_contents(&self, folder_id: &str) -> UpstreamResult;
    async fn create_folder(&self, name: &str, parent_folder_id: Option<&str>) -> UpstreamResult;
    async fn rename_folder(&self, folder_id: &str, new_name: &str) -> UpstreamResult;
    async fn delete_folder(&self, folder_id: &str) -> UpstreamResult;
    async fn rename_file(&self, file_id: &str, new_name: &str) -> UpstreamResult;
    async fn move_file(&self, file_id: &str, destination_folder_id: &str) -> UpstreamResult;
    async fn delete_file(&self, file_id: &str) -> UpstreamResult;
    async fn upload_url(&self, folder_id: &str) -> UpstreamResult;
    async fn add_remote_upload(&self, url: &str, folder_id: &str) -> UpstreamResult;
    async fn remote_upload_status(&self, upload_id: &str) -> UpstreamResult;
    async fn remove_remote_upload(&self, upload_id: &str) -> UpstreamResult;
    async fn thumbnail(&self, file_id: &str) -> UpstreamResult;
}

#[derive(Clone)]
pub struct HttpFileService {
    http: Client,
    base_url: Url,
}

impl HttpFileService {
    pub fn new(base_url: &str) -> Result<Self, UpstreamError> {
        let base_url = Url::parse(base_url).map_err(|_| UpstreamError::InvalidUrl)?;
        if base_url.cannot_be_a_base() {
            return Err(UpstreamError::InvalidUrl);
        }
        Ok(Self {
            http: Client::new(),
            base_url,
        })
    }

    /// Appends percent-encoded path segments to the base URL.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, UpstreamError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| UpstreamError::InvalidUrl)?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> UpstreamResult {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!(status = status.as_u16(), body = %body, "file service call failed");
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl FileService for HttpFileService {
    async fn list_contents(&self, folder_id: &str) -> UpstreamResult {
        debug!(folder_id, "listing folder contents");
        let url = self.endpoint(&["v1", "file_manager", "list_contents"])?;
        self.send(self.http.get(url).query(&[("folder_id", folder_id)]))
            .await
    }

    async fn create_folder(&self, name: &str, parent_folder_id: Option<&str>) -> UpstreamResult {
        let url = self.endpoint(&["v1", "file_manager", "create_folder"])?;
        let mut query = vec![("name", name)];
        if let Some(parent) = parent_folder_id {
            query.push(("parent_folder_id", parent));
        }
        self.send(self.http.post(url).query(&query)).await
    }

    async fn rename_folder(&self, folder_id: &str, new_name: &str) -> UpstreamResult {
        let url = self.endpoint(&["v1", "file_manager", "rename_folder", folder_id])?;
        self.send(self.http.put(url).query(&[("new_name", new_name)]))
            .await
    }

    async fn delete_folder(&self, folder_id: &str) -> UpstreamResult {
        let url = self.endpoint(&["v1", "file_manager", "delete_folder", folder_id])?;
        self.send(self.http.delete(url)).await
    }

    async fn rename_file(&self, file_id: &str, new_name: &str) -> UpstreamResult {
        let url = self.endpoint(&["v1", "file_manager", "rename_file", file_id])?;
        self.send(self.http.put(url).query(&[("new_name", new_name)]))
            .await
    }

    async fn move_file(&self, file_id: &str, destination_folder_id: &str) -> UpstreamResult {
        let url = self.endpoint(&["v1", "file_manager", "move_file", file_id])?;
        self.send(
            self.http
                .put(url)
                .json(&json!({ "destination": destination_folder_id })),
        )
        .await
    }

    async fn delete_file(&self, file_id: &str) -> UpstreamResult {
        let url = self.endpoint(&["v1", "file_manager", "delete_file", file_id])?;
        self.send(self.http.delete(url)).await
    }

    async fn upload_url(&self, folder_id: &str) -> UpstreamResult {
        let url = self.endpoint(&["v1", "get_upload_url"])?;
        self.send(self.http.get(url).query(&[("folder", folder_id)]))
            .await
    }

    async fn add_remote_upload(&self, url: &str, folder_id: &str) -> UpstreamResult {
        let endpoint = self.endpoint(&["v1", "remote_upload", "add"])?;
        self.send(
            self.http
                .post(endpoint)
                .query(&[("url", url), ("folder", folder_id)]),
        )
        .await
    }

    async fn remote_upload_status(&self, upload_id: &str) -> UpstreamResult {
        let url = self.endpoint(&["v1", "remote_upload", "status", upload_id])?;
        self.send(self.http.get(url)).await
    }

    async fn remove_remote_upload(&self, upload_id: &str) -> UpstreamResult {
        let url = self.endpoint(&["v1", "remote_upload", "remove", upload_id])?;
        self.send(self.http.delete(url)).await
    }

    async fn thumbnail(&self, file_id: &str) -> UpstreamResult {
        let url = self.endpoint(&["v1", "thumbnail", file_id])?;
        self.send(self.http.get(url)).await
    }
}
