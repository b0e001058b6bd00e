//! Per-project folder provisioning.
//!
//! A project gets one root folder under the configured parent and three
//! category subfolders inside it. Every folder is shared as `writer` with
//! anyone holding the link. Each step's outcome is recorded so a partial
//! failure tells the caller exactly what exists remotely.

use std::sync::Arc;

use futures::future::join3;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use utoipa::ToSchema;

use super::{sanitize_file_name, Category};
use crate::drive::{DriveProvider, FolderRef, PermissionRole};
use crate::StudioError;

/// What to do with already created folders when provisioning fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupPolicy {
    /// Leave them in place.
    #[default]
    Keep,
    /// Try to delete each one; failures are only logged.
    BestEffort,
}

/// Category subfolders of a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SubfolderSet {
    pub raw: FolderRef,
    pub edited: FolderRef,
    pub thumbnails: FolderRef,
}

impl SubfolderSet {
    pub fn get(&self, category: Category) -> &FolderRef {
        match category {
            Category::Raw => &self.raw,
            Category::Edited => &self.edited,
            Category::Thumbnails => &self.thumbnails,
        }
    }
}

/// Folder tree of one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectFolderSet {
    pub root: FolderRef,
    pub subfolders: SubfolderSet,
}

/// Wire form of a folder tree, as returned by the create-folder route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FolderStructure {
    pub project_folder_id: String,
    pub project_folder_name: String,
    pub subfolders: SubfolderSet,
}

impl From<ProjectFolderSet> for FolderStructure {
    fn from(set: ProjectFolderSet) -> Self {
        Self {
            project_folder_id: set.root.id,
            project_folder_name: set.root.name,
            subfolders: set.subfolders,
        }
    }
}

/// One provisioning step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionStep {
    Root,
    Subfolder(Category),
}

/// Result of one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Folder created and shared.
    Created(FolderRef),
    /// The step failed. `folder` is set when the folder was created but
    /// sharing it failed.
    Failed {
        folder: Option<FolderRef>,
        message: String,
    },
}

/// Step-by-step record of a provisioning run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionReport {
    /// Name given to the root folder.
    pub folder_name: String,
    /// Outcomes in the order the steps finished being recorded.
    pub steps: Vec<(ProvisionStep, StepOutcome)>,
    /// Ids of folders deleted by best-effort cleanup.
    pub cleaned_up: Vec<String>,
}

impl ProvisionReport {
    /// Outcome of a step, if it ran.
    pub fn outcome(&self, step: ProvisionStep) -> Option<&StepOutcome> {
        self.steps.iter().find(|(s, _)| *s == step).map(|(_, o)| o)
    }

    /// Whether a step ran to completion.
    pub fn succeeded(&self, step: ProvisionStep) -> bool {
        matches!(self.outcome(step), Some(StepOutcome::Created(_)))
    }

    /// Every folder that exists remotely because of this run, subfolders
    /// before the root.
    pub fn created_folders(&self) -> Vec<&FolderRef> {
        let mut folders: Vec<(ProvisionStep, &FolderRef)> = self
            .steps
            .iter()
            .filter_map(|(step, outcome)| match outcome {
                StepOutcome::Created(f) => Some((*step, f)),
                StepOutcome::Failed { folder, .. } => folder.as_ref().map(|f| (*step, f)),
            })
            .collect();
        folders.sort_by_key(|(step, _)| matches!(step, ProvisionStep::Root));
        folders.into_iter().map(|(_, f)| f).collect()
    }

    fn first_error(&self) -> Option<&str> {
        self.steps.iter().find_map(|(_, o)| match o {
            StepOutcome::Failed { message, .. } => Some(message.as_str()),
            StepOutcome::Created(_) => None,
        })
    }
}

/// Provisioning failure.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("Project ID and title are required")]
    InvalidInput,

    #[error("Failed to create project folder structure")]
    Failed {
        /// Provider message of the first failed step.
        details: String,
        report: ProvisionReport,
    },
}

impl ProvisionError {
    /// Provider message, when the failure came from the provider.
    pub fn details(&self) -> Option<&str> {
        match self {
            ProvisionError::InvalidInput => None,
            ProvisionError::Failed { details, .. } => Some(details),
        }
    }

    pub fn report(&self) -> Option<&ProvisionReport> {
        match self {
            ProvisionError::InvalidInput => None,
            ProvisionError::Failed { report, .. } => Some(report),
        }
    }
}

impl From<ProvisionError> for StudioError {
    fn from(err: ProvisionError) -> Self {
        match err {
            ProvisionError::InvalidInput => StudioError::Validation(err.to_string()),
            ProvisionError::Failed { details, .. } => StudioError::Provider(details),
        }
    }
}

/// Root folder name for a project.
pub fn project_folder_name(project_id: &str, project_title: &str) -> String {
    format!("{}_{}", sanitize_file_name(project_title), project_id)
}

/// Creates project folder trees.
pub struct FolderProvisioner {
    provider: Arc<dyn DriveProvider>,
    parent_folder_id: String,
    cleanup: CleanupPolicy,
}

impl FolderProvisioner {
    pub fn new(
        provider: Arc<dyn DriveProvider>,
        parent_folder_id: impl Into<String>,
        cleanup: CleanupPolicy,
    ) -> Self {
        Self {
            provider,
            parent_folder_id: parent_folder_id.into(),
            cleanup,
        }
    }

    pub fn cleanup_policy(&self) -> CleanupPolicy {
        self.cleanup
    }

    /// Create the root folder and its three subfolders.
    ///
    /// Nothing is persisted here; storing the returned set on the project
    /// is the caller's job.
    pub async fn provision_project_folders(
        &self,
        project_id: &str,
        project_title: &str,
    ) -> Result<ProjectFolderSet, ProvisionError> {
        let project_id = project_id.trim();
        let project_title = project_title.trim();
        if project_id.is_empty() || project_title.is_empty() {
            return Err(ProvisionError::InvalidInput);
        }

        let mut report = ProvisionReport {
            folder_name: project_folder_name(project_id, project_title),
            ..Default::default()
        };

        let root_outcome = self
            .shared_folder(&report.folder_name, &self.parent_folder_id)
            .await;
        report.steps.push((ProvisionStep::Root, root_outcome.clone()));

        let root = match root_outcome {
            StepOutcome::Created(root) => root,
            StepOutcome::Failed { .. } => return Err(self.fail(project_id, report).await),
        };

        let (raw, edited, thumbnails) = join3(
            self.shared_folder(Category::Raw.folder_name(), &root.id),
            self.shared_folder(Category::Edited.folder_name(), &root.id),
            self.shared_folder(Category::Thumbnails.folder_name(), &root.id),
        )
        .await;

        for (category, outcome) in [
            (Category::Raw, raw),
            (Category::Edited, edited),
            (Category::Thumbnails, thumbnails),
        ] {
            report
                .steps
                .push((ProvisionStep::Subfolder(category), outcome));
        }

        let subfolder = |category| match report.outcome(ProvisionStep::Subfolder(category)) {
            Some(StepOutcome::Created(folder)) => Some(folder.clone()),
            _ => None,
        };
        let set = match (
            subfolder(Category::Raw),
            subfolder(Category::Edited),
            subfolder(Category::Thumbnails),
        ) {
            (Some(raw), Some(edited), Some(thumbnails)) => ProjectFolderSet {
                root,
                subfolders: SubfolderSet {
                    raw,
                    edited,
                    thumbnails,
                },
            },
            _ => return Err(self.fail(project_id, report).await),
        };

        info!(
            project_id,
            folder_id = %set.root.id,
            folder_name = %set.root.name,
            "Provisioned project folders"
        );
        Ok(set)
    }

    /// Create a folder and share it. A folder whose sharing failed is still
    /// reported so it can be cleaned up.
    async fn shared_folder(&self, name: &str, parent_id: &str) -> StepOutcome {
        let folder = match self.provider.create_folder(name, parent_id).await {
            Ok(folder) => folder,
            Err(e) => {
                return StepOutcome::Failed {
                    folder: None,
                    message: e.message(),
                }
            }
        };

        match self
            .provider
            .grant_public(&folder.id, PermissionRole::Writer)
            .await
        {
            Ok(()) => StepOutcome::Created(folder),
            Err(e) => StepOutcome::Failed {
                folder: Some(folder),
                message: e.message(),
            },
        }
    }

    async fn fail(&self, project_id: &str, mut report: ProvisionReport) -> ProvisionError {
        let details = report.first_error().unwrap_or_default().to_string();
        error!(
            project_id,
            folder_name = %report.folder_name,
            error = %details,
            "Failed to provision project folders"
        );

        if self.cleanup == CleanupPolicy::BestEffort {
            let ids: Vec<String> = report
                .created_folders()
                .into_iter()
                .map(|f| f.id.clone())
                .collect();
            for id in ids {
                match self.provider.delete(&id).await {
                    Ok(()) => report.cleaned_up.push(id),
                    Err(e) => warn!(project_id, folder_id = %id, error = %e, "Cleanup failed"),
                }
            }
        }

        ProvisionError::Failed { details, report }
    }
}
