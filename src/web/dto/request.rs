//! Request DTOs for Web API.

use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Create-folder request.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateFolderRequest {
    /// Project identifier.
    #[serde(default)]
    #[validate(length(min = 1, message = "Project ID and title are required"))]
    pub project_id: String,
    /// Project title, used in the folder name.
    #[serde(default)]
    #[validate(length(min = 1, message = "Project ID and title are required"))]
    pub project_title: String,
}

/// Query of the listing route.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListFilesQuery {
    /// Category folder to list.
    pub folder_id: Option<String>,
    /// `raw`, `edited` or `thumbnails`.
    pub category: Option<String>,
}

/// Query of the delete route. Both fields are needed to invalidate the
/// cached listing.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct DeleteFileQuery {
    pub project_id: Option<String>,
    pub category: Option<String>,
}

/// Upload form, for documentation only; the handler reads the multipart
/// stream field by field.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadForm {
    /// File content.
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
    pub project_id: String,
    /// `raw`, `edited` or `thumbnails`.
    pub category: String,
    pub folder_id: String,
}
