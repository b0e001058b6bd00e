//! Attaching folder trees to project records.
//!
//! Project persistence lives outside this crate. [`ProjectStore`] is the
//! narrow interface the setup routines need: look projects up and write the
//! provisioned folder ids back.

use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::media::{Category, FolderProvisioner, ProjectFolderSet};
use crate::{Result, StudioError};

/// Subfolder ids stored on a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveSubfolders {
    pub raw: String,
    pub edited: String,
    pub thumbnails: String,
}

impl DriveSubfolders {
    pub fn get(&self, category: Category) -> &str {
        match category {
            Category::Raw => &self.raw,
            Category::Edited => &self.edited,
            Category::Thumbnails => &self.thumbnails,
        }
    }
}

impl From<&ProjectFolderSet> for DriveSubfolders {
    fn from(set: &ProjectFolderSet) -> Self {
        Self {
            raw: set.subfolders.raw.id.clone(),
            edited: set.subfolders.edited.id.clone(),
            thumbnails: set.subfolders.thumbnails.id.clone(),
        }
    }
}

/// The parts of a project record this crate reads and writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: String,
    pub title: String,
    pub drive_folder_id: Option<String>,
    pub drive_subfolders: Option<DriveSubfolders>,
}

impl ProjectRecord {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            drive_folder_id: None,
            drive_subfolders: None,
        }
    }

    /// A folder set is either fully recorded or absent.
    pub fn has_folders(&self) -> bool {
        self.drive_folder_id.is_some() && self.drive_subfolders.is_some()
    }
}

/// Project persistence.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn get(&self, project_id: &str) -> Result<Option<ProjectRecord>>;

    async fn list(&self) -> Result<Vec<ProjectRecord>>;

    /// Record the folder tree of a project.
    async fn save_folders(
        &self,
        project_id: &str,
        folder_id: &str,
        subfolders: &DriveSubfolders,
    ) -> Result<()>;
}

/// In-memory [`ProjectStore`].
#[derive(Debug, Default)]
pub struct MemoryProjectStore {
    projects: RwLock<Vec<ProjectRecord>>,
}

impl MemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: ProjectRecord) {
        let mut projects = self.projects.write().unwrap_or_else(PoisonError::into_inner);
        projects.retain(|p| p.id != record.id);
        projects.push(record);
    }
}

#[async_trait]
impl ProjectStore for MemoryProjectStore {
    async fn get(&self, project_id: &str) -> Result<Option<ProjectRecord>> {
        let projects = self.projects.read().unwrap_or_else(PoisonError::into_inner);
        Ok(projects.iter().find(|p| p.id == project_id).cloned())
    }

    async fn list(&self) -> Result<Vec<ProjectRecord>> {
        Ok(self
            .projects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    async fn save_folders(
        &self,
        project_id: &str,
        folder_id: &str,
        subfolders: &DriveSubfolders,
    ) -> Result<()> {
        let mut projects = self.projects.write().unwrap_or_else(PoisonError::into_inner);
        let project = projects
            .iter_mut()
            .find(|p| p.id == project_id)
            .ok_or_else(|| StudioError::NotFound(format!("Project {project_id}")))?;
        project.drive_folder_id = Some(folder_id.to_string());
        project.drive_subfolders = Some(subfolders.clone());
        Ok(())
    }
}

/// Result of [`ensure_project_folders`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupOutcome {
    /// The project already had folders; the provider was not called.
    AlreadyProvisioned {
        folder_id: String,
        subfolders: DriveSubfolders,
    },
    /// Folders were created and recorded.
    Provisioned(ProjectFolderSet),
}

/// Give a project its folder tree unless it already has one.
pub async fn ensure_project_folders(
    store: &dyn ProjectStore,
    provisioner: &FolderProvisioner,
    project_id: &str,
) -> Result<SetupOutcome> {
    let project = store
        .get(project_id)
        .await?
        .ok_or_else(|| StudioError::NotFound(format!("Project {project_id}")))?;

    if let (Some(folder_id), Some(subfolders)) =
        (project.drive_folder_id, project.drive_subfolders)
    {
        return Ok(SetupOutcome::AlreadyProvisioned {
            folder_id,
            subfolders,
        });
    }

    let set = provisioner
        .provision_project_folders(&project.id, &project.title)
        .await?;
    store
        .save_folders(&project.id, &set.root.id, &DriveSubfolders::from(&set))
        .await?;

    info!(project_id, folder_id = %set.root.id, "Recorded project folders");
    Ok(SetupOutcome::Provisioned(set))
}

/// Provision every project that has no folder tree yet, one at a time.
///
/// A failing project is reported and the batch moves on.
pub async fn ensure_all_project_folders(
    store: &dyn ProjectStore,
    provisioner: &FolderProvisioner,
) -> Result<Vec<(String, Result<SetupOutcome>)>> {
    let pending: Vec<ProjectRecord> = store
        .list()
        .await?
        .into_iter()
        .filter(|p| !p.has_folders())
        .collect();

    info!(count = pending.len(), "Projects without folders");

    let mut outcomes = Vec::with_capacity(pending.len());
    for project in pending {
        let outcome = ensure_project_folders(store, provisioner, &project.id).await;
        if let Err(e) = &outcome {
            error!(project_id = %project.id, error = %e, "Project setup failed");
        }
        outcomes.push((project.id, outcome));
    }
    Ok(outcomes)
}
