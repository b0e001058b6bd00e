//! Drive handlers for Web API.

use axum::{
    extract::{multipart::Field, multipart::MultipartError, Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use bytes::{Bytes, BytesMut};
use chrono::{SecondsFormat, Utc};
use std::sync::Arc;

use crate::drive::RemoteFile;
use crate::media::validation::gigabytes;
use crate::media::{validate_file_type, Category, FolderStructure, ProvisionError, UploadRequest};
use crate::web::dto::{
    ApiResponse, CreateFolderRequest, DeleteFileQuery, FileListResponse, FolderStructureResponse,
    HealthResponse, ListFilesQuery, MessageResponse, RemoteFileResponse, UploadForm,
    ValidatedJson,
};
use crate::web::error::{ApiError, ErrorBody};
use crate::web::handlers::AppState;

const UPLOAD_FAILED: &str = "Failed to upload file";
const LIST_FAILED: &str = "Failed to fetch files";
const DELETE_FAILED: &str = "Failed to delete file";
const METADATA_FAILED: &str = "Failed to fetch file metadata";

fn file_too_large(max_file_size: u64) -> ApiError {
    ApiError::payload_too_large(format!(
        "File too large. Maximum size is {}GB",
        gigabytes(max_file_size)
    ))
}

fn multipart_error(err: MultipartError, max_file_size: u64) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return file_too_large(max_file_size);
    }
    ApiError::bad_request(err.body_text())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// POST /api/drive/create-folder - Provision the folder tree of a project.
#[utoipa::path(
    post,
    path = "/api/drive/create-folder",
    tag = "drive",
    request_body = CreateFolderRequest,
    responses(
        (status = 200, description = "Folder tree created", body = FolderStructureResponse),
        (status = 400, description = "Missing project ID or title", body = ErrorBody),
        (status = 500, description = "Provider failure", body = ErrorBody)
    )
)]
pub async fn create_folder(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<CreateFolderRequest>,
) -> Result<Json<ApiResponse<FolderStructure>>, ApiError> {
    let set = state
        .provisioner
        .provision_project_folders(&req.project_id, &req.project_title)
        .await
        .map_err(|e| match e {
            ProvisionError::InvalidInput => ApiError::bad_request(e.to_string()),
            ProvisionError::Failed {
                ref details,
                ref report,
            } => {
                tracing::error!(
                    project_id = %req.project_id,
                    steps = ?report.steps,
                    cleaned_up = report.cleaned_up.len(),
                    "Error creating project folder"
                );
                ApiError::internal(e.to_string()).with_details(details.clone())
            }
        })?;

    Ok(Json(ApiResponse::new(FolderStructure::from(set))))
}

/// A file part read from the upload form.
struct FilePart {
    name: String,
    mime_type: String,
    bytes: Bytes,
}

/// Read a file part, stopping as soon as it exceeds the ceiling.
async fn read_file_field(field: &mut Field<'_>, max_file_size: u64) -> Result<Bytes, ApiError> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| multipart_error(e, max_file_size))?
    {
        if (buf.len() + chunk.len()) as u64 > max_file_size {
            return Err(file_too_large(max_file_size));
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf.freeze())
}

/// POST /api/drive/upload - Upload a file into a category folder.
///
/// Multipart fields: `file`, `projectId`, `category`, `folderId`. When
/// `category` comes before `file`, the file type is checked before any of
/// its bytes are read.
#[utoipa::path(
    post,
    path = "/api/drive/upload",
    tag = "drive",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "File uploaded", body = RemoteFileResponse),
        (status = 400, description = "Invalid category, type or missing field", body = ErrorBody),
        (status = 413, description = "File too large", body = ErrorBody),
        (status = 429, description = "Too many upload requests", body = ErrorBody),
        (status = 500, description = "Provider failure", body = ErrorBody)
    )
)]
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<RemoteFile>>, ApiError> {
    let max_file_size = state.max_file_size;

    let mut project_id: Option<String> = None;
    let mut category: Option<String> = None;
    let mut folder_id: Option<String> = None;
    let mut file: Option<FilePart> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_file_size))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == "file" {
            let mime_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            if let Some(category) = category.as_deref() {
                validate_file_type(&mime_type, category)
                    .map_err(|e| ApiError::from_studio(e, UPLOAD_FAILED))?;
            }
            let file_name = field.file_name().unwrap_or("upload").to_string();
            let bytes = read_file_field(&mut field, max_file_size).await?;
            file = Some(FilePart {
                name: file_name,
                mime_type,
                bytes,
            });
            continue;
        }

        let target = match name.as_str() {
            "projectId" => &mut project_id,
            "category" => &mut category,
            "folderId" => &mut folder_id,
            _ => continue,
        };
        *target = Some(
            field
                .text()
                .await
                .map_err(|e| multipart_error(e, max_file_size))?,
        );
    }

    let file = file.ok_or_else(|| ApiError::bad_request("No file provided"))?;
    let category =
        non_empty(category).ok_or_else(|| ApiError::bad_request("File category is required"))?;
    let category = validate_file_type(&file.mime_type, &category)
        .map_err(|e| ApiError::from_studio(e, UPLOAD_FAILED))?;
    let folder_id =
        non_empty(folder_id).ok_or_else(|| ApiError::bad_request("Folder ID is required"))?;
    let project_id =
        non_empty(project_id).ok_or_else(|| ApiError::bad_request("Project ID is required"))?;

    let uploaded = state
        .gateway
        .upload(UploadRequest {
            project_id,
            category,
            folder_id,
            original_name: file.name,
            mime_type: file.mime_type,
            bytes: file.bytes,
        })
        .await
        .map_err(|e| ApiError::from_studio(e, UPLOAD_FAILED))?;

    Ok(Json(ApiResponse::new(uploaded)))
}

/// GET /api/drive/files/:projectId - List files of a category folder.
#[utoipa::path(
    get,
    path = "/api/drive/files/{projectId}",
    tag = "drive",
    params(
        ("projectId" = String, Path, description = "Project ID"),
        ListFilesQuery
    ),
    responses(
        (status = 200, description = "Files, newest first", body = FileListResponse),
        (status = 400, description = "Missing folder ID or invalid category", body = ErrorBody),
        (status = 500, description = "Provider failure", body = ErrorBody)
    )
)]
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
    Query(query): Query<ListFilesQuery>,
) -> Result<Json<FileListResponse>, ApiError> {
    let folder_id = non_empty(query.folder_id)
        .ok_or_else(|| ApiError::bad_request("Folder ID is required"))?;
    let category: Category = query
        .category
        .unwrap_or_default()
        .parse()
        .map_err(|e| ApiError::from_studio(e, LIST_FAILED))?;

    let listing = state
        .gateway
        .list(&project_id, category, &folder_id)
        .await
        .map_err(|e| ApiError::from_studio(e, LIST_FAILED))?;

    Ok(Json(FileListResponse {
        success: true,
        data: listing.files,
        cached: listing.cached,
    }))
}

/// DELETE /api/drive/file/:fileId - Delete a file.
#[utoipa::path(
    delete,
    path = "/api/drive/file/{fileId}",
    tag = "drive",
    params(
        ("fileId" = String, Path, description = "File ID"),
        DeleteFileQuery
    ),
    responses(
        (status = 200, description = "File deleted", body = MessageResponse),
        (status = 400, description = "Invalid category", body = ErrorBody),
        (status = 500, description = "Provider failure", body = ErrorBody)
    )
)]
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<String>,
    Query(query): Query<DeleteFileQuery>,
) -> Result<Json<MessageResponse>, ApiError> {
    let category = match non_empty(query.category) {
        Some(raw) => Some(
            raw.parse::<Category>()
                .map_err(|e| ApiError::from_studio(e, DELETE_FAILED))?,
        ),
        None => None,
    };
    let project_id = non_empty(query.project_id);
    let scope = match (project_id.as_deref(), category) {
        (Some(project_id), Some(category)) => Some((project_id, category)),
        _ => None,
    };

    state
        .gateway
        .delete(&file_id, scope)
        .await
        .map_err(|e| ApiError::from_studio(e, DELETE_FAILED))?;

    Ok(Json(MessageResponse::new("File deleted successfully")))
}

/// GET /api/drive/file/:fileId/metadata - Current metadata of a file.
#[utoipa::path(
    get,
    path = "/api/drive/file/{fileId}/metadata",
    tag = "drive",
    params(
        ("fileId" = String, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "File metadata", body = RemoteFileResponse),
        (status = 500, description = "Provider failure", body = ErrorBody)
    )
)]
pub async fn file_metadata(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<String>,
) -> Result<Json<ApiResponse<RemoteFile>>, ApiError> {
    let file = state
        .gateway
        .metadata(&file_id)
        .await
        .map_err(|e| ApiError::from_studio(e, METADATA_FAILED))?;

    Ok(Json(ApiResponse::new(file)))
}

/// GET /health - Liveness check.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

/// Fallback for unknown API routes.
pub async fn not_found() -> ApiError {
    ApiError::not_found("Route not found")
}
