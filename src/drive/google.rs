//! Google Drive v3 REST client.
//!
//! Uses the JSON metadata API for folders, permissions, listing and
//! deletion, and a single `multipart/related` request for uploads.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::{
    DriveProvider, FolderRef, NewRemoteFile, PermissionRole, RemoteFile, FILE_FIELDS,
    FOLDER_MIME_TYPE,
};
use crate::config::DriveConfig;
use crate::{Result, StudioError};

/// Connect timeout in seconds.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Page size for folder listings.
const LIST_PAGE_SIZE: u32 = 1000;

const USER_AGENT: &str = concat!("studio-drive/", env!("CARGO_PKG_VERSION"));

/// Supplies bearer tokens for provider calls.
///
/// Token acquisition (service-account exchange, refresh) lives behind this
/// trait; the client only asks for a current token per request.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

/// A fixed token, e.g. one minted by an external credential helper.
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorPayload,
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<RemoteFile>,
    next_page_token: Option<String>,
}

/// Google Drive client.
pub struct GoogleDriveClient {
    client: Client,
    api_base: String,
    upload_base: String,
    tokens: Arc<dyn TokenSource>,
}

impl GoogleDriveClient {
    /// Create a client from configuration and a token source.
    pub fn new(config: &DriveConfig, tokens: Arc<dyn TokenSource>) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| StudioError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            upload_base: config.upload_base.trim_end_matches('/').to_string(),
            tokens,
        })
    }

    fn file_url(&self, file_id: &str) -> String {
        format!("{}/files/{}", self.api_base, urlencoding::encode(file_id))
    }

    async fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        let token = self.tokens.access_token().await?;
        Ok(request.header(AUTHORIZATION, format!("Bearer {token}")))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = self
            .authorized(request)
            .await?
            .send()
            .await
            .map_err(|e| StudioError::Provider(format!("request failed: {e}")))?;
        check_status(response).await
    }
}

/// Turn a non-success response into a provider error carrying the
/// provider's own message.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| format!("HTTP {status}"));
    Err(StudioError::Provider(message))
}

async fn parse_json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
    response
        .json::<T>()
        .await
        .map_err(|e| StudioError::Provider(format!("invalid provider response: {e}")))
}

/// Drive query literal escaping.
fn quote_query_value(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Build a `multipart/related` body: JSON metadata part, then media part.
fn related_body(boundary: &str, metadata: &serde_json::Value, file: &NewRemoteFile) -> Vec<Bytes> {
    let head = format!(
        "--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n\
         --{boundary}\r\nContent-Type: {}\r\n\r\n",
        file.mime_type
    );
    let tail = format!("\r\n--{boundary}--\r\n");
    vec![Bytes::from(head), file.content.clone(), Bytes::from(tail)]
}

#[async_trait]
impl DriveProvider for GoogleDriveClient {
    async fn create_folder(&self, name: &str, parent_id: &str) -> Result<FolderRef> {
        let request = self
            .client
            .post(format!("{}/files", self.api_base))
            .query(&[("fields", "id,name")])
            .json(&json!({
                "name": name,
                "mimeType": FOLDER_MIME_TYPE,
                "parents": [parent_id],
            }));

        let response = self.send(request).await?;
        parse_json(response).await
    }

    async fn create_file(&self, file: NewRemoteFile) -> Result<RemoteFile> {
        let boundary = format!("studio-drive-{}", Uuid::new_v4().simple());
        let metadata = json!({
            "name": file.name,
            "parents": [file.parent_id],
        });
        let parts = related_body(&boundary, &metadata, &file);
        let length: usize = parts.iter().map(Bytes::len).sum();
        let stream = futures::stream::iter(parts.into_iter().map(Ok::<_, std::io::Error>));

        let request = self
            .client
            .post(format!("{}/files", self.upload_base))
            .query(&[("uploadType", "multipart"), ("fields", FILE_FIELDS)])
            .header(
                CONTENT_TYPE,
                format!("multipart/related; boundary={boundary}"),
            )
            .header(CONTENT_LENGTH, length)
            .body(reqwest::Body::wrap_stream(stream));

        let response = self.send(request).await?;
        parse_json(response).await
    }

    async fn grant_public(&self, file_id: &str, role: PermissionRole) -> Result<()> {
        let request = self
            .client
            .post(format!("{}/permissions", self.file_url(file_id)))
            .json(&json!({
                "role": role.as_str(),
                "type": "anyone",
            }));

        self.send(request).await?;
        Ok(())
    }

    async fn list_children(&self, folder_id: &str) -> Result<Vec<RemoteFile>> {
        let query = format!("{} in parents and trashed=false", quote_query_value(folder_id));
        let fields = format!("nextPageToken,files({FILE_FIELDS})");
        let page_size = LIST_PAGE_SIZE.to_string();

        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut params = vec![
                ("q", query.as_str()),
                ("fields", fields.as_str()),
                ("orderBy", "createdTime desc"),
                ("pageSize", page_size.as_str()),
            ];
            if let Some(token) = page_token.as_deref() {
                params.push(("pageToken", token));
            }

            let request = self
                .client
                .get(format!("{}/files", self.api_base))
                .query(&params);
            let page: FileList = parse_json(self.send(request).await?).await?;

            files.extend(page.files);
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(files)
    }

    async fn delete(&self, file_id: &str) -> Result<()> {
        let request = self.client.delete(self.file_url(file_id));
        self.send(request).await?;
        Ok(())
    }

    async fn get(&self, file_id: &str) -> Result<RemoteFile> {
        let request = self
            .client
            .get(self.file_url(file_id))
            .query(&[("fields", FILE_FIELDS)]);
        let response = self.send(request).await?;
        parse_json(response).await
    }
}
