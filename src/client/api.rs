//! HTTP client for the `/api/drive` routes.

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc::UnboundedSender;
use url::Url;

use super::queue::{UploadBackend, UploadSource};
use crate::drive::RemoteFile;
use crate::media::{Category, FolderStructure};
use crate::project::DriveSubfolders;

/// Upload body chunk size; progress is reported once per chunk.
const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// Where a client-side failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveApiErrorKind {
    /// The server answered with a failure.
    Api,
    /// No usable answer (connection, timeout, abort).
    Network,
    /// The server answered with something unreadable.
    Parse,
    /// The request could not be built.
    Request,
}

/// Error surfaced to the user by the client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct DriveApiError {
    pub kind: DriveApiErrorKind,
    pub message: String,
    pub details: Option<String>,
    pub status: Option<u16>,
}

impl DriveApiError {
    fn new(kind: DriveApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
            status: None,
        }
    }

    fn network(message: &str, e: reqwest::Error) -> Self {
        Self {
            details: Some(e.to_string()),
            ..Self::new(DriveApiErrorKind::Network, message)
        }
    }
}

/// Bytes sent so far for one upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgress {
    pub loaded: u64,
    pub total: u64,
}

impl UploadProgress {
    /// `round(loaded / total * 100)`; an empty body counts as done.
    pub fn percentage(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        let pct = (self.loaded as f64 / self.total as f64 * 100.0).round();
        pct.clamp(0.0, 100.0) as u8
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    data: Option<T>,
    error: Option<String>,
    details: Option<String>,
}

/// Client for the media service API.
#[derive(Debug, Clone)]
pub struct DriveApiClient {
    http: Client,
    base: Url,
}

impl DriveApiClient {
    /// Create a client for a service base URL such as `http://localhost:3001`.
    pub fn new(base_url: &str) -> Result<Self, DriveApiError> {
        let http = Client::builder().build().map_err(|e| DriveApiError {
            details: Some(e.to_string()),
            ..DriveApiError::new(DriveApiErrorKind::Request, "Failed to create HTTP client")
        })?;
        Self::with_client(http, base_url)
    }

    /// Create a client on an existing `reqwest` client.
    pub fn with_client(http: Client, base_url: &str) -> Result<Self, DriveApiError> {
        let base = Url::parse(base_url)
            .ok()
            .filter(|u| !u.cannot_be_a_base())
            .ok_or_else(|| {
                DriveApiError::new(
                    DriveApiErrorKind::Request,
                    format!("Invalid base URL: {base_url}"),
                )
            })?;
        Ok(Self { http, base })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // `new` rejects cannot-be-a-base URLs, so segments are always available
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(["api", "drive"]).extend(segments);
        }
        url
    }

    /// Provision the folder tree of a project.
    pub async fn create_project_folder(
        &self,
        project_id: &str,
        project_title: &str,
    ) -> Result<FolderStructure, DriveApiError> {
        let response = self
            .http
            .post(self.endpoint(&["create-folder"]))
            .json(&json!({
                "projectId": project_id,
                "projectTitle": project_title,
            }))
            .send()
            .await
            .map_err(|e| DriveApiError::network("Request failed", e))?;

        require_data(read_envelope(response, "Request failed").await?)
    }

    /// Upload one file, reporting progress on `progress` as the body is sent.
    pub async fn upload_file(
        &self,
        source: &UploadSource,
        project_id: &str,
        category: Category,
        folder_id: &str,
        progress: Option<UnboundedSender<UploadProgress>>,
    ) -> Result<RemoteFile, DriveApiError> {
        let total = source.bytes.len() as u64;
        let stream = futures::stream::iter(chunks(&source.bytes)).scan(
            0u64,
            move |loaded, chunk| {
                *loaded += chunk.len() as u64;
                if let Some(tx) = &progress {
                    // Receiver gone means nobody is listening anymore
                    let _ = tx.send(UploadProgress {
                        loaded: *loaded,
                        total,
                    });
                }
                futures::future::ready(Some(Ok::<_, std::io::Error>(chunk)))
            },
        );

        let file = Part::stream_with_length(Body::wrap_stream(stream), total)
            .file_name(source.file_name.clone())
            .mime_str(&source.mime_type)
            .map_err(|e| DriveApiError {
                details: Some(e.to_string()),
                ..DriveApiError::new(DriveApiErrorKind::Request, "Invalid file type")
            })?;

        // Text fields go first so the server can reject a bad category early
        let form = Form::new()
            .text("projectId", project_id.to_string())
            .text("category", category.as_str())
            .text("folderId", folder_id.to_string())
            .part("file", file);

        let response = self
            .http
            .post(self.endpoint(&["upload"]))
            .multipart(form)
            .send()
            .await
            .map_err(|e| DriveApiError::network("Network error during upload", e))?;

        require_data(read_envelope(response, "Upload failed").await?)
    }

    /// Files of one category folder, newest first.
    pub async fn get_project_files(
        &self,
        project_id: &str,
        category: Category,
        folder_id: &str,
    ) -> Result<Vec<RemoteFile>, DriveApiError> {
        let response = self
            .http
            .get(self.endpoint(&["files", project_id]))
            .query(&[("folderId", folder_id), ("category", category.as_str())])
            .send()
            .await
            .map_err(|e| DriveApiError::network("Request failed", e))?;

        require_data(read_envelope(response, "Request failed").await?)
    }

    /// Delete a file. Passing the project and category lets the server drop
    /// its cached listing.
    pub async fn delete_file(
        &self,
        file_id: &str,
        project_id: Option<&str>,
        category: Option<Category>,
    ) -> Result<(), DriveApiError> {
        let mut query = Vec::new();
        if let Some(project_id) = project_id {
            query.push(("projectId", project_id));
        }
        if let Some(category) = category {
            query.push(("category", category.as_str()));
        }

        let response = self
            .http
            .delete(self.endpoint(&["file", file_id]))
            .query(&query)
            .send()
            .await
            .map_err(|e| DriveApiError::network("Request failed", e))?;

        read_envelope::<serde_json::Value>(response, "Request failed").await?;
        Ok(())
    }

    /// Current metadata of a file.
    pub async fn get_file_metadata(&self, file_id: &str) -> Result<RemoteFile, DriveApiError> {
        let response = self
            .http
            .get(self.endpoint(&["file", file_id, "metadata"]))
            .send()
            .await
            .map_err(|e| DriveApiError::network("Request failed", e))?;

        require_data(read_envelope(response, "Request failed").await?)
    }
}

fn chunks(bytes: &Bytes) -> Vec<Bytes> {
    (0..bytes.len())
        .step_by(UPLOAD_CHUNK_SIZE)
        .map(|start| bytes.slice(start..(start + UPLOAD_CHUNK_SIZE).min(bytes.len())))
        .collect()
}

/// Read the `{success, data, error, details}` envelope.
///
/// Any non-2xx status or `success: false` becomes an `Api` error carrying
/// the server's message, or `fallback` when there is none.
async fn read_envelope<T: DeserializeOwned>(
    response: Response,
    fallback: &str,
) -> Result<Option<T>, DriveApiError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| DriveApiError::network("Request failed", e))?;

    match serde_json::from_str::<Envelope<T>>(&body) {
        Ok(envelope) if status.is_success() && envelope.success => Ok(envelope.data),
        Ok(envelope) => Err(DriveApiError {
            kind: DriveApiErrorKind::Api,
            message: envelope.error.unwrap_or_else(|| fallback.to_string()),
            details: envelope.details,
            status: Some(status.as_u16()),
        }),
        Err(_) if status.is_success() => Err(DriveApiError {
            status: Some(status.as_u16()),
            ..DriveApiError::new(DriveApiErrorKind::Parse, "Failed to parse response")
        }),
        Err(_) => Err(DriveApiError {
            status: Some(status.as_u16()),
            ..DriveApiError::new(DriveApiErrorKind::Api, fallback)
        }),
    }
}

fn require_data<T>(data: Option<T>) -> Result<T, DriveApiError> {
    data.ok_or_else(|| DriveApiError::new(DriveApiErrorKind::Parse, "Failed to parse response"))
}

/// Upload target of one project: the API client plus the project's
/// category folders.
#[derive(Debug, Clone)]
pub struct ProjectUploadTarget {
    pub client: DriveApiClient,
    pub project_id: String,
    pub folders: DriveSubfolders,
}

#[async_trait]
impl UploadBackend for ProjectUploadTarget {
    async fn upload(
        &self,
        source: UploadSource,
        category: Category,
        progress: UnboundedSender<UploadProgress>,
    ) -> Result<RemoteFile, DriveApiError> {
        self.client
            .upload_file(
                &source,
                &self.project_id,
                category,
                self.folders.get(category),
                Some(progress),
            )
            .await
    }

    async fn list(&self, category: Category) -> Result<Vec<RemoteFile>, DriveApiError> {
        self.client
            .get_project_files(&self.project_id, category, self.folders.get(category))
            .await
    }
}
