//! Web API Drive Tests
//!
//! Integration tests for project folders and file endpoints.

mod common;

use axum::http::{HeaderName, StatusCode};
use axum_test::multipart::{MultipartForm, Part};
use serde_json::{json, Value};
use studio_drive::drive::{DriveOp, PermissionRole};

use common::{create_project, create_test_config, create_test_server, upload_form};

const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

// ============================================================================
// Create Folder Tests
// ============================================================================

#[tokio::test]
async fn test_create_folder_success() {
    let (server, drive) = create_test_server(&create_test_config());

    let data = create_project(&server, "proj-1", "Launch Trailer").await;

    assert_eq!(data["projectFolderName"], "Launch_Trailer_proj-1");
    let root_id = data["projectFolderId"].as_str().unwrap();
    assert!(drive.exists(root_id));
    assert_eq!(drive.public_role(root_id), Some(PermissionRole::Writer));

    assert_eq!(data["subfolders"]["raw"]["name"], "Raw Footage");
    assert_eq!(data["subfolders"]["edited"]["name"], "Edited Videos");
    assert_eq!(data["subfolders"]["thumbnails"]["name"], "Thumbnails");

    let mut children = drive.child_names(root_id);
    children.sort();
    assert_eq!(children, ["Edited Videos", "Raw Footage", "Thumbnails"]);
}

#[tokio::test]
async fn test_create_folder_missing_title() {
    let (server, drive) = create_test_server(&create_test_config());

    let response = server
        .post("/api/drive/create-folder")
        .json(&json!({ "projectId": "proj-1" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Project ID and title are required");
    assert_eq!(drive.calls(DriveOp::CreateFolder), 0);
}

#[tokio::test]
async fn test_create_folder_blank_id() {
    let (server, _drive) = create_test_server(&create_test_config());

    let response = server
        .post("/api/drive/create-folder")
        .json(&json!({ "projectId": "   ", "projectTitle": "Title" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json::<Value>()["error"],
        "Project ID and title are required"
    );
}

#[tokio::test]
async fn test_create_folder_provider_failure() {
    let (server, drive) = create_test_server(&create_test_config());
    drive.fail_folder_named("Thumbnails");

    let response = server
        .post("/api/drive/create-folder")
        .json(&json!({ "projectId": "proj-1", "projectTitle": "Title" }))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.json::<Value>();
    assert_eq!(body["error"], "Failed to create project folder structure");
    assert_eq!(body["details"], "injected failure: folder Thumbnails");
}

// ============================================================================
// Upload Tests
// ============================================================================

#[tokio::test]
async fn test_upload_success() {
    let (server, drive) = create_test_server(&create_test_config());
    let project = create_project(&server, "proj-1", "Title").await;
    let raw_id = project["subfolders"]["raw"]["id"].as_str().unwrap();

    let response = server
        .post("/api/drive/upload")
        .multipart(upload_form(
            "proj-1",
            "raw",
            raw_id,
            "take 1.mp4",
            "video/mp4",
            vec![7u8; 100],
        ))
        .await;

    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["name"], "take_1.mp4");
    assert_eq!(body["data"]["mimeType"], "video/mp4");
    assert_eq!(body["data"]["size"], "100");

    let file_id = body["data"]["id"].as_str().unwrap();
    assert_eq!(drive.content(file_id).unwrap().len(), 100);
    assert_eq!(drive.public_role(file_id), Some(PermissionRole::Reader));
}

#[tokio::test]
async fn test_upload_wrong_type_for_category() {
    let (server, drive) = create_test_server(&create_test_config());
    let project = create_project(&server, "proj-1", "Title").await;
    let thumbs_id = project["subfolders"]["thumbnails"]["id"].as_str().unwrap();

    let response = server
        .post("/api/drive/upload")
        .multipart(upload_form(
            "proj-1",
            "thumbnails",
            thumbs_id,
            "clip.mp4",
            "video/mp4",
            vec![0u8; 10],
        ))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let error = response.json::<Value>()["error"].as_str().unwrap().to_string();
    assert!(error.starts_with("Invalid file type for thumbnails"));
    assert_eq!(drive.calls(DriveOp::CreateFile), 0);
}

#[tokio::test]
async fn test_upload_invalid_category() {
    let (server, _drive) = create_test_server(&create_test_config());

    let response = server
        .post("/api/drive/upload")
        .multipart(upload_form(
            "proj-1",
            "bloopers",
            "folder",
            "clip.mp4",
            "video/mp4",
            vec![0u8; 10],
        ))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "Invalid file category");
}

#[tokio::test]
async fn test_upload_without_category() {
    let (server, drive) = create_test_server(&create_test_config());

    let form = MultipartForm::new()
        .add_text("projectId", "proj-1")
        .add_text("folderId", "folder")
        .add_part(
            "file",
            Part::bytes(vec![0u8; 10])
                .file_name("clip.mp4")
                .mime_type("video/mp4"),
        );
    let response = server.post("/api/drive/upload").multipart(form).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "File category is required");
    assert_eq!(drive.calls(DriveOp::CreateFile), 0);
}

#[tokio::test]
async fn test_upload_without_file() {
    let (server, _drive) = create_test_server(&create_test_config());

    let form = MultipartForm::new()
        .add_text("projectId", "proj-1")
        .add_text("category", "raw")
        .add_text("folderId", "folder");
    let response = server.post("/api/drive/upload").multipart(form).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "No file provided");
}

#[tokio::test]
async fn test_upload_without_folder() {
    let (server, _drive) = create_test_server(&create_test_config());

    let form = MultipartForm::new()
        .add_text("projectId", "proj-1")
        .add_text("category", "raw")
        .add_part(
            "file",
            Part::bytes(vec![0u8; 10])
                .file_name("clip.mp4")
                .mime_type("video/mp4"),
        );
    let response = server.post("/api/drive/upload").multipart(form).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "Folder ID is required");
}

#[tokio::test]
async fn test_upload_without_project() {
    let (server, _drive) = create_test_server(&create_test_config());

    let form = MultipartForm::new()
        .add_text("category", "raw")
        .add_text("folderId", "folder")
        .add_part(
            "file",
            Part::bytes(vec![0u8; 10])
                .file_name("clip.mp4")
                .mime_type("video/mp4"),
        );
    let response = server.post("/api/drive/upload").multipart(form).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "Project ID is required");
}

#[tokio::test]
async fn test_upload_too_large() {
    let config = create_test_config();
    let (server, drive) = create_test_server(&config);
    let project = create_project(&server, "proj-1", "Title").await;
    let raw_id = project["subfolders"]["raw"]["id"].as_str().unwrap();

    let oversized = vec![1u8; (config.uploads.max_file_size_bytes + 1) as usize];
    let response = server
        .post("/api/drive/upload")
        .multipart(upload_form(
            "proj-1",
            "raw",
            raw_id,
            "big.mp4",
            "video/mp4",
            oversized,
        ))
        .await;

    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
    let error = response.json::<Value>()["error"].as_str().unwrap().to_string();
    assert!(error.starts_with("File too large. Maximum size is "));
    assert!(error.ends_with("GB"));
    assert_eq!(drive.calls(DriveOp::CreateFile), 0);
}

#[tokio::test]
async fn test_upload_exactly_at_limit() {
    let config = create_test_config();
    let (server, _drive) = create_test_server(&config);
    let project = create_project(&server, "proj-1", "Title").await;
    let raw_id = project["subfolders"]["raw"]["id"].as_str().unwrap();

    let response = server
        .post("/api/drive/upload")
        .multipart(upload_form(
            "proj-1",
            "raw",
            raw_id,
            "edge.mp4",
            "video/mp4",
            vec![1u8; config.uploads.max_file_size_bytes as usize],
        ))
        .await;

    response.assert_status_ok();
}

#[tokio::test]
async fn test_upload_rate_limit() {
    let mut config = create_test_config();
    config.uploads.rate_limit_per_minute = 2;
    let (server, _drive) = create_test_server(&config);
    let project = create_project(&server, "proj-1", "Title").await;
    let raw_id = project["subfolders"]["raw"]["id"].as_str().unwrap().to_string();

    let upload = |ip: &'static str| {
        server
            .post("/api/drive/upload")
            .add_header(X_FORWARDED_FOR, ip)
            .multipart(upload_form(
                "proj-1",
                "raw",
                &raw_id,
                "clip.mp4",
                "video/mp4",
                vec![0u8; 10],
            ))
    };

    upload("10.0.0.1").await.assert_status_ok();
    upload("10.0.0.1").await.assert_status_ok();

    let response = upload("10.0.0.1").await;
    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        response.json::<Value>()["error"],
        "Too many upload requests, please try again later"
    );
    let retry_after: u64 = response
        .header("retry-after")
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!((1..=60).contains(&retry_after));

    // Another caller has its own window
    upload("10.0.0.2").await.assert_status_ok();

    // Other routes are not affected by the upload ceiling
    server
        .get(&format!("/api/drive/files/proj-1?folderId={raw_id}&category=raw"))
        .add_header(X_FORWARDED_FOR, "10.0.0.1")
        .await
        .assert_status_ok();
}

// ============================================================================
// List Tests
// ============================================================================

#[tokio::test]
async fn test_list_cached_and_invalidated_by_upload() {
    let (server, drive) = create_test_server(&create_test_config());
    let project = create_project(&server, "proj-1", "Title").await;
    let raw_id = project["subfolders"]["raw"]["id"].as_str().unwrap().to_string();
    let list_path = format!("/api/drive/files/proj-1?folderId={raw_id}&category=raw");

    let first = server.get(&list_path).await;
    first.assert_status_ok();
    let body = first.json::<Value>();
    assert_eq!(body["cached"], false);
    assert_eq!(body["data"].as_array().unwrap().len(), 0);

    let second = server.get(&list_path).await.json::<Value>();
    assert_eq!(second["cached"], true);
    assert_eq!(drive.calls(DriveOp::List), 1);

    for name in ["a.mp4", "b.mp4"] {
        server
            .post("/api/drive/upload")
            .multipart(upload_form(
                "proj-1",
                "raw",
                &raw_id,
                name,
                "video/mp4",
                vec![0u8; 10],
            ))
            .await
            .assert_status_ok();
    }

    let third = server.get(&list_path).await.json::<Value>();
    assert_eq!(third["cached"], false);
    let names: Vec<&str> = third["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["b.mp4", "a.mp4"]);
}

#[tokio::test]
async fn test_list_missing_folder_id() {
    let (server, _drive) = create_test_server(&create_test_config());

    let response = server.get("/api/drive/files/proj-1?category=raw").await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "Folder ID is required");
}

#[tokio::test]
async fn test_list_invalid_category() {
    let (server, _drive) = create_test_server(&create_test_config());

    let response = server
        .get("/api/drive/files/proj-1?folderId=abc&category=music")
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "Invalid file category");
}

#[tokio::test]
async fn test_list_provider_failure() {
    let (server, _drive) = create_test_server(&create_test_config());

    let response = server
        .get("/api/drive/files/proj-1?folderId=missing&category=raw")
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.json::<Value>();
    assert_eq!(body["error"], "Failed to fetch files");
    assert_eq!(body["details"], "File not found: missing.");
}

// ============================================================================
// Delete Tests
// ============================================================================

#[tokio::test]
async fn test_delete_file_invalidates_listing() {
    let (server, drive) = create_test_server(&create_test_config());
    let project = create_project(&server, "proj-1", "Title").await;
    let raw_id = project["subfolders"]["raw"]["id"].as_str().unwrap().to_string();
    let list_path = format!("/api/drive/files/proj-1?folderId={raw_id}&category=raw");

    let uploaded = server
        .post("/api/drive/upload")
        .multipart(upload_form(
            "proj-1",
            "raw",
            &raw_id,
            "a.mp4",
            "video/mp4",
            vec![0u8; 10],
        ))
        .await
        .json::<Value>();
    let file_id = uploaded["data"]["id"].as_str().unwrap().to_string();

    // Warm the cache
    let listed = server.get(&list_path).await.json::<Value>();
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);

    let response = server
        .delete(&format!(
            "/api/drive/file/{file_id}?projectId=proj-1&category=raw"
        ))
        .await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "File deleted successfully");
    assert!(!drive.exists(&file_id));

    let after = server.get(&list_path).await.json::<Value>();
    assert_eq!(after["cached"], false);
    assert_eq!(after["data"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_delete_without_scope_keeps_cache() {
    let (server, _drive) = create_test_server(&create_test_config());
    let project = create_project(&server, "proj-1", "Title").await;
    let raw_id = project["subfolders"]["raw"]["id"].as_str().unwrap().to_string();
    let list_path = format!("/api/drive/files/proj-1?folderId={raw_id}&category=raw");

    let uploaded = server
        .post("/api/drive/upload")
        .multipart(upload_form(
            "proj-1",
            "raw",
            &raw_id,
            "a.mp4",
            "video/mp4",
            vec![0u8; 10],
        ))
        .await
        .json::<Value>();
    let file_id = uploaded["data"]["id"].as_str().unwrap().to_string();
    server.get(&list_path).await.assert_status_ok();

    server
        .delete(&format!("/api/drive/file/{file_id}"))
        .await
        .assert_status_ok();

    // Stale until the entry expires
    let after = server.get(&list_path).await.json::<Value>();
    assert_eq!(after["cached"], true);
    assert_eq!(after["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_delete_invalid_category() {
    let (server, _drive) = create_test_server(&create_test_config());

    let response = server
        .delete("/api/drive/file/mem-1?projectId=proj-1&category=music")
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_missing_file() {
    let (server, _drive) = create_test_server(&create_test_config());

    let response = server.delete("/api/drive/file/missing").await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json::<Value>()["error"], "Failed to delete file");
}

// ============================================================================
// Metadata Tests
// ============================================================================

#[tokio::test]
async fn test_file_metadata() {
    let (server, _drive) = create_test_server(&create_test_config());
    let project = create_project(&server, "proj-1", "Title").await;
    let thumbs_id = project["subfolders"]["thumbnails"]["id"].as_str().unwrap();

    let uploaded = server
        .post("/api/drive/upload")
        .multipart(upload_form(
            "proj-1",
            "thumbnails",
            thumbs_id,
            "cover.png",
            "image/png",
            vec![0u8; 32],
        ))
        .await
        .json::<Value>();
    let file_id = uploaded["data"]["id"].as_str().unwrap();

    let response = server
        .get(&format!("/api/drive/file/{file_id}/metadata"))
        .await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["data"]["id"], file_id);
    assert_eq!(body["data"]["name"], "cover.png");
    assert_eq!(body["data"]["mimeType"], "image/png");
}

#[tokio::test]
async fn test_file_metadata_missing() {
    let (server, _drive) = create_test_server(&create_test_config());

    let response = server.get("/api/drive/file/missing/metadata").await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.json::<Value>();
    assert_eq!(body["error"], "Failed to fetch file metadata");
    assert_eq!(body["details"], "File not found: missing.");
}

// ============================================================================
// Misc
// ============================================================================

#[tokio::test]
async fn test_unknown_route() {
    let (server, _drive) = create_test_server(&create_test_config());

    let response = server.get("/api/drive/nope").await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body = response.json::<Value>();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Route not found");
}

#[tokio::test]
async fn test_health() {
    let (server, _drive) = create_test_server(&create_test_config());

    let response = server.get("/health").await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["status"], "ok");
}

#[tokio::test]
async fn test_openapi_document_served() {
    let (server, _drive) = create_test_server(&create_test_config());

    let response = server.get("/api-docs/openapi.json").await;

    response.assert_status_ok();
    let body = response.json::<Value>();
    assert!(body["paths"]["/api/drive/upload"].is_object());
}
