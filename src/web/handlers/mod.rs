//! API handlers.

pub mod drive;

pub use drive::*;

use std::sync::Arc;

use crate::config::Config;
use crate::drive::DriveProvider;
use crate::media::{FileGateway, FileListCache, FolderProvisioner};

/// Shared application state.
pub struct AppState {
    /// File operations with the listing cache.
    pub gateway: FileGateway,
    /// Project folder provisioning.
    pub provisioner: FolderProvisioner,
    /// Largest accepted upload in bytes.
    pub max_file_size: u64,
}

impl AppState {
    /// Wire the media services to a provider.
    pub fn new(provider: Arc<dyn DriveProvider>, config: &Config) -> Self {
        Self {
            gateway: FileGateway::new(provider.clone(), FileListCache::new(config.cache.ttl())),
            provisioner: FolderProvisioner::new(
                provider,
                config.drive.root_folder_id.clone(),
                config.provisioning.cleanup,
            ),
            max_file_size: config.uploads.max_file_size_bytes,
        }
    }
}
