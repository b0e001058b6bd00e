//! Project media management.
//!
//! This module provides the server-side media subsystem:
//! - Filename sanitizing and MIME type validation
//! - Per-project folder provisioning in the storage provider
//! - The file gateway (upload, list, delete, metadata) with a listing cache

pub mod cache;
pub mod gateway;
pub mod provisioner;
pub mod validation;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub use cache::{CacheKey, Clock, FileListCache, ManualClock, SystemClock};
pub use gateway::{FileGateway, Listing, UploadRequest};
pub use provisioner::{
    project_folder_name, CleanupPolicy, FolderProvisioner, FolderStructure, ProjectFolderSet,
    ProvisionError, ProvisionReport, ProvisionStep, StepOutcome, SubfolderSet,
};
pub use validation::{
    file_extension, format_file_size, is_image_file, is_video_file, sanitize_file_name,
    validate_file_size, validate_file_type,
};

/// Maximum length of a sanitized name (in characters).
pub const MAX_NAME_LENGTH: usize = 255;

/// Accepted MIME types for video categories.
pub const VIDEO_MIME_TYPES: &[&str] = &[
    "video/mp4",
    "video/quicktime",
    "video/x-msvideo",
    "video/x-matroska",
    "video/webm",
];

/// Accepted MIME types for image categories.
pub const IMAGE_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

/// Kind of production media, which decides both the subfolder and the
/// accepted MIME types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Raw footage.
    Raw,
    /// Edited videos.
    Edited,
    /// Thumbnail images.
    Thumbnails,
}

impl Category {
    /// All categories, in folder creation order.
    pub const ALL: [Category; 3] = [Category::Raw, Category::Edited, Category::Thumbnails];

    /// Wire name (`raw`, `edited`, `thumbnails`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Raw => "raw",
            Category::Edited => "edited",
            Category::Thumbnails => "thumbnails",
        }
    }

    /// Name of the subfolder created for this category.
    pub fn folder_name(&self) -> &'static str {
        match self {
            Category::Raw => "Raw Footage",
            Category::Edited => "Edited Videos",
            Category::Thumbnails => "Thumbnails",
        }
    }

    /// MIME types accepted for this category.
    pub fn allowed_mime_types(&self) -> &'static [&'static str] {
        match self {
            Category::Raw | Category::Edited => VIDEO_MIME_TYPES,
            Category::Thumbnails => IMAGE_MIME_TYPES,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = crate::StudioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raw" => Ok(Category::Raw),
            "edited" => Ok(Category::Edited),
            "thumbnails" => Ok(Category::Thumbnails),
            _ => Err(crate::StudioError::Validation(
                "Invalid file category".to_string(),
            )),
        }
    }
}
