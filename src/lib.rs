//! studio-drive - media storage for a creator studio.
//!
//! Every project gets a folder tree in a cloud drive (`raw`, `edited`,
//! `thumbnails`). Files are uploaded into those folders through a guarded
//! HTTP API, listed through a short-lived cache, and fed from the client
//! side by a bounded upload queue.

pub mod client;
pub mod config;
pub mod drive;
pub mod error;
pub mod logging;
pub mod media;
pub mod project;
pub mod rate_limit;
pub mod web;

pub use client::{DriveApiClient, UploadQueue, UploadSource};
pub use config::Config;
pub use drive::{DriveProvider, GoogleDriveClient, MemoryDrive, RemoteFile};
pub use error::{Result, StudioError};
pub use media::{Category, FileGateway, FolderProvisioner};
pub use project::{ensure_all_project_folders, ensure_project_folders, ProjectStore};
