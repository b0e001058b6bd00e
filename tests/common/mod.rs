//! Test helpers for API tests.
//!
//! Builds the full application over an in-memory drive.

#![allow(dead_code)]

use std::sync::Arc;

use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use serde_json::Value;

use studio_drive::config::{Config, DriveBackend};
use studio_drive::web::{build_app, AppState, RateLimitState};
use studio_drive::MemoryDrive;

/// Upload ceiling used by the tests.
pub const TEST_MAX_FILE_SIZE: u64 = 1024;

/// Create a test configuration.
pub fn create_test_config() -> Config {
    let mut config = Config::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = 0;
    config.web.cors_origins = vec![];
    config.web.api_rate_limit = 1000;
    config.drive.backend = DriveBackend::Memory;
    config.drive.root_folder_id = "root".to_string();
    config.uploads.max_file_size_bytes = TEST_MAX_FILE_SIZE;
    config.uploads.rate_limit_per_minute = 100;
    config
}

/// Create a test server over a fresh in-memory drive.
pub fn create_test_server(config: &Config) -> (TestServer, Arc<MemoryDrive>) {
    let drive = Arc::new(MemoryDrive::new(config.drive.root_folder_id.clone()));
    let app_state = Arc::new(AppState::new(drive.clone(), config));
    let rate_limit_state = Arc::new(RateLimitState::new(
        config.web.api_rate_limit,
        config.uploads.rate_limit_per_minute,
    ));

    let router = build_app(app_state, rate_limit_state, config);
    let server = TestServer::new(router).expect("Failed to create test server");

    (server, drive)
}

/// Provision a project and return the response data.
pub async fn create_project(server: &TestServer, project_id: &str, title: &str) -> Value {
    let response = server
        .post("/api/drive/create-folder")
        .json(&serde_json::json!({
            "projectId": project_id,
            "projectTitle": title
        }))
        .await;
    response.assert_status_ok();
    response.json::<Value>()["data"].clone()
}

/// A well-formed upload form.
pub fn upload_form(
    project_id: &str,
    category: &str,
    folder_id: &str,
    file_name: &str,
    mime_type: &str,
    bytes: Vec<u8>,
) -> MultipartForm {
    MultipartForm::new()
        .add_text("projectId", project_id.to_string())
        .add_text("category", category.to_string())
        .add_text("folderId", folder_id.to_string())
        .add_part(
            "file",
            Part::bytes(bytes)
                .file_name(file_name.to_string())
                .mime_type(mime_type.to_string()),
        )
}
