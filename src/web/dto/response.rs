//! Response DTOs for Web API.

use serde::Serialize;
use utoipa::ToSchema;

use crate::drive::RemoteFile;
use crate::media::FolderStructure;

/// Success wrapper: `{success: true, data}`.
#[derive(Debug, Serialize, ToSchema)]
#[aliases(
    FolderStructureResponse = ApiResponse<FolderStructure>,
    RemoteFileResponse = ApiResponse<RemoteFile>
)]
pub struct ApiResponse<T: Serialize> {
    /// Always `true`.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a new API response.
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Listing response.
#[derive(Debug, Serialize, ToSchema)]
pub struct FileListResponse {
    pub success: bool,
    /// Files, newest first.
    pub data: Vec<RemoteFile>,
    /// Whether the listing came from the cache.
    pub cached: bool,
}

/// Response carrying only a message.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Always `ok`.
    pub status: String,
    /// Current time (RFC 3339).
    pub timestamp: String,
}
