//! OpenAPI document and Swagger UI.

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::drive::{FolderRef, RemoteFile};
use crate::media::{Category, FolderStructure, SubfolderSet};
use crate::web::dto::{
    CreateFolderRequest, FileListResponse, FolderStructureResponse, HealthResponse,
    MessageResponse, RemoteFileResponse, UploadForm,
};
use crate::web::error::ErrorBody;
use crate::web::handlers;

#[derive(OpenApi)]
#[openapi(
    info(title = "studio-drive", description = "Project media folders and uploads"),
    paths(
        handlers::create_folder,
        handlers::upload_file,
        handlers::list_files,
        handlers::delete_file,
        handlers::file_metadata,
        handlers::health_check,
    ),
    components(schemas(
        Category,
        CreateFolderRequest,
        ErrorBody,
        FileListResponse,
        FolderRef,
        FolderStructure,
        FolderStructureResponse,
        HealthResponse,
        MessageResponse,
        RemoteFile,
        RemoteFileResponse,
        SubfolderSet,
        UploadForm,
    )),
    tags(
        (name = "drive", description = "Project folders and files"),
        (name = "health", description = "Liveness")
    )
)]
pub struct ApiDoc;

/// Swagger UI at `/swagger-ui`, spec at `/api-docs/openapi.json`.
pub fn create_swagger_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .into()
}
