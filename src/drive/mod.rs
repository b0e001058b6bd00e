//! Remote storage provider access.
//!
//! The gateway and the provisioner only talk to [`DriveProvider`]. Two
//! implementations exist:
//! - [`GoogleDriveClient`]: the Google Drive v3 REST API
//! - [`MemoryDrive`]: a process-local tree for development and tests

mod google;
mod memory;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::Result;

pub use google::{GoogleDriveClient, StaticToken, TokenSource};
pub use memory::{DriveOp, MemoryDrive};

/// MIME type the provider uses for folders.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Metadata fields requested for files.
pub const FILE_FIELDS: &str =
    "id,name,mimeType,size,createdTime,modifiedTime,thumbnailLink,webViewLink,webContentLink";

/// One file as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    /// Provider-assigned identifier.
    pub id: String,
    /// File name (sanitized at upload time).
    pub name: String,
    /// MIME type.
    #[serde(default)]
    pub mime_type: String,
    /// Size in bytes as a decimal string. Absent for folders.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    /// Creation time (RFC 3339).
    #[serde(default)]
    pub created_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_view_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_content_link: Option<String>,
}

impl RemoteFile {
    /// Size as a number, when the provider reported a parsable one.
    pub fn size_bytes(&self) -> Option<u64> {
        self.size.as_deref().and_then(|s| s.parse().ok())
    }
}

/// Identifier and name of a provider folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FolderRef {
    pub id: String,
    pub name: String,
}

/// Access level granted to everyone holding the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionRole {
    Reader,
    Writer,
}

impl PermissionRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionRole::Reader => "reader",
            PermissionRole::Writer => "writer",
        }
    }
}

/// A file to create in the provider.
#[derive(Debug, Clone)]
pub struct NewRemoteFile {
    /// Final (already sanitized) name.
    pub name: String,
    /// Declared MIME type.
    pub mime_type: String,
    /// Parent folder.
    pub parent_id: String,
    /// File content.
    pub content: Bytes,
}

/// Operations the media subsystem needs from a storage provider.
///
/// Every failure is reported as [`crate::StudioError::Provider`] carrying
/// the provider's own message.
#[async_trait]
pub trait DriveProvider: Send + Sync {
    /// Create a folder under `parent_id`.
    async fn create_folder(&self, name: &str, parent_id: &str) -> Result<FolderRef>;

    /// Create a file with content.
    async fn create_file(&self, file: NewRemoteFile) -> Result<RemoteFile>;

    /// Grant `role` to anyone with the link.
    async fn grant_public(&self, file_id: &str, role: PermissionRole) -> Result<()>;

    /// Non-trashed children of a folder, newest first.
    async fn list_children(&self, folder_id: &str) -> Result<Vec<RemoteFile>>;

    /// Permanently delete a file or folder.
    async fn delete(&self, file_id: &str) -> Result<()>;

    /// Fetch metadata of one file.
    async fn get(&self, file_id: &str) -> Result<RemoteFile>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_file_deserializes_provider_json() {
        let json = r#"{
            "id": "1AbC",
            "name": "take_01.mp4",
            "mimeType": "video/mp4",
            "size": "1048576",
            "createdTime": "2026-10-01T10:00:00.000Z",
            "webViewLink": "https://drive.google.com/file/d/1AbC/view"
        }"#;

        let file: RemoteFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.id, "1AbC");
        assert_eq!(file.mime_type, "video/mp4");
        assert_eq!(file.size_bytes(), Some(1_048_576));
        assert!(file.thumbnail_link.is_none());
        assert_eq!(
            file.web_view_link.as_deref(),
            Some("https://drive.google.com/file/d/1AbC/view")
        );
    }

    #[test]
    fn test_remote_file_serializes_camel_case_without_empty_links() {
        let file = RemoteFile {
            id: "f1".to_string(),
            name: "thumb.png".to_string(),
            mime_type: "image/png".to_string(),
            size: Some("42".to_string()),
            created_time: "2026-10-01T10:00:00Z".to_string(),
            modified_time: None,
            thumbnail_link: None,
            web_view_link: None,
            web_content_link: None,
        };

        let value = serde_json::to_value(&file).unwrap();
        assert_eq!(value["mimeType"], "image/png");
        assert_eq!(value["createdTime"], "2026-10-01T10:00:00Z");
        assert!(value.get("thumbnailLink").is_none());
        assert!(value.get("mime_type").is_none());
    }

    #[test]
    fn test_permission_role_names() {
        assert_eq!(PermissionRole::Reader.as_str(), "reader");
        assert_eq!(PermissionRole::Writer.as_str(), "writer");
    }
}
