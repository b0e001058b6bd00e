//! File operations against the storage provider.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, error, info};

use super::cache::{CacheKey, Clock, FileListCache, SystemClock};
use super::{sanitize_file_name, Category};
use crate::drive::{DriveProvider, NewRemoteFile, PermissionRole, RemoteFile};
use crate::{Result, StudioError};

/// A validated upload on its way to the provider.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub project_id: String,
    pub category: Category,
    pub folder_id: String,
    /// Name as supplied by the client; sanitized before use.
    pub original_name: String,
    pub mime_type: String,
    pub bytes: Bytes,
}

/// A folder listing and whether it came from the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub files: Vec<RemoteFile>,
    pub cached: bool,
}

/// Upload, list, delete and describe project files.
pub struct FileGateway<C: Clock = SystemClock> {
    provider: Arc<dyn DriveProvider>,
    cache: FileListCache<C>,
}

impl<C: Clock> FileGateway<C> {
    pub fn new(provider: Arc<dyn DriveProvider>, cache: FileListCache<C>) -> Self {
        Self { provider, cache }
    }

    pub fn cache(&self) -> &FileListCache<C> {
        &self.cache
    }

    /// Store a file in its category folder and make it readable by link.
    pub async fn upload(&self, request: UploadRequest) -> Result<RemoteFile> {
        if request.folder_id.trim().is_empty() {
            return Err(StudioError::Validation("Folder ID is required".to_string()));
        }

        let name = sanitize_file_name(&request.original_name);
        let size = request.bytes.len();
        let key = CacheKey::new(request.project_id.as_str(), request.category);

        let file = self
            .provider
            .create_file(NewRemoteFile {
                name,
                mime_type: request.mime_type,
                parent_id: request.folder_id,
                content: request.bytes,
            })
            .await
            .map_err(|e| {
                error!(
                    project_id = %key.project_id,
                    category = %key.category,
                    error = %e,
                    "Upload to provider failed"
                );
                e
            })?;

        // The file exists now, so the listing is stale whatever happens next
        self.cache.invalidate(&key);

        self.provider
            .grant_public(&file.id, PermissionRole::Reader)
            .await
            .map_err(|e| {
                error!(file_id = %file.id, error = %e, "Failed to share uploaded file");
                e
            })?;

        info!(
            project_id = %key.project_id,
            category = %key.category,
            file_id = %file.id,
            size,
            "Uploaded file"
        );
        Ok(file)
    }

    /// Files in a category folder, newest first.
    pub async fn list(&self, project_id: &str, category: Category, folder_id: &str) -> Result<Listing> {
        if folder_id.trim().is_empty() {
            return Err(StudioError::Validation("Folder ID is required".to_string()));
        }

        let key = CacheKey::new(project_id, category);
        if let Some(files) = self.cache.get(&key) {
            debug!(project_id, %category, "Listing served from cache");
            return Ok(Listing {
                files,
                cached: true,
            });
        }

        let files = self.provider.list_children(folder_id).await.map_err(|e| {
            error!(project_id, %category, folder_id, error = %e, "Listing failed");
            e
        })?;
        self.cache.put(key, files.clone());

        Ok(Listing {
            files,
            cached: false,
        })
    }

    /// Delete a file. The listing of `scope` is invalidated when given.
    pub async fn delete(&self, file_id: &str, scope: Option<(&str, Category)>) -> Result<()> {
        self.provider.delete(file_id).await.map_err(|e| {
            error!(file_id, error = %e, "Delete failed");
            e
        })?;

        if let Some((project_id, category)) = scope {
            self.cache.invalidate(&CacheKey::new(project_id, category));
        }

        info!(file_id, "Deleted file");
        Ok(())
    }

    /// Current metadata of a file.
    pub async fn metadata(&self, file_id: &str) -> Result<RemoteFile> {
        self.provider.get(file_id).await.map_err(|e| {
            error!(file_id, error = %e, "Metadata lookup failed");
            e
        })
    }
}
