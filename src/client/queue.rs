//! Client-side upload queue.
//!
//! Files are queued as tasks and uploaded with at most `max_concurrent`
//! transfers in flight. Every state change runs the scheduler again, so a
//! finished transfer immediately makes room for the next pending task.
//!
//! Cancelling a task that is uploading removes it from the queue right away
//! but does not abort the transfer. The transfer keeps its slot until it
//! resolves, and whatever it reports afterwards is dropped because its task
//! no longer exists.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::{mpsc, Notify};
use tracing::{debug, warn};
use uuid::Uuid;

use super::api::{DriveApiError, DriveApiErrorKind, UploadProgress};
use crate::config::UploadsConfig;
use crate::drive::RemoteFile;
use crate::media::Category;
use crate::Result;

/// Task identifier.
pub type TaskId = Uuid;

/// A file picked for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSource {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Bytes,
}

impl UploadSource {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, guessing its MIME type from the extension.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        Ok(Self {
            file_name,
            mime_type,
            bytes: Bytes::from(bytes),
        })
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Lifecycle of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Uploading,
    Completed,
    Error,
}

/// One queued upload.
#[derive(Debug, Clone)]
pub struct UploadTask {
    pub id: TaskId,
    pub source: UploadSource,
    pub category: Category,
    /// 0..=100
    pub progress: u8,
    pub status: TaskStatus,
    pub error: Option<String>,
}

/// Where the queue sends files.
#[async_trait]
pub trait UploadBackend: Send + Sync + 'static {
    /// Upload one file, reporting progress on `progress`.
    async fn upload(
        &self,
        source: UploadSource,
        category: Category,
        progress: mpsc::UnboundedSender<UploadProgress>,
    ) -> std::result::Result<RemoteFile, DriveApiError>;

    /// Current files of a category, newest first.
    async fn list(&self, category: Category) -> std::result::Result<Vec<RemoteFile>, DriveApiError>;
}

/// Queue tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueConfig {
    /// Transfers allowed in flight at once.
    pub max_concurrent: usize,
    /// How long a completed task stays visible.
    pub completed_grace: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 3,
            completed_grace: Duration::from_millis(2000),
        }
    }
}

impl From<&UploadsConfig> for QueueConfig {
    fn from(config: &UploadsConfig) -> Self {
        Self {
            max_concurrent: config.max_concurrent,
            completed_grace: config.completed_grace(),
        }
    }
}

#[derive(Debug, Default)]
struct QueueState {
    tasks: Vec<UploadTask>,
    in_flight: usize,
    reloading: usize,
    listings: HashMap<Category, Vec<RemoteFile>>,
}

impl QueueState {
    fn task_mut(&mut self, id: TaskId) -> Option<&mut UploadTask> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    fn is_idle(&self) -> bool {
        self.in_flight == 0
            && self.reloading == 0
            && !self.tasks.iter().any(|t| t.status == TaskStatus::Pending)
    }
}

struct Inner<B> {
    backend: B,
    config: QueueConfig,
    state: Mutex<QueueState>,
    changed: Notify,
}

/// Bounded-concurrency upload coordinator. Cheap to clone; clones share
/// the same queue.
pub struct UploadQueue<B: UploadBackend> {
    inner: Arc<Inner<B>>,
}

impl<B: UploadBackend> Clone for UploadQueue<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: UploadBackend> UploadQueue<B> {
    /// Create a queue. A `max_concurrent` of zero is raised to one.
    pub fn new(backend: B, config: QueueConfig) -> Self {
        let config = QueueConfig {
            max_concurrent: config.max_concurrent.max(1),
            ..config
        };
        Self {
            inner: Arc::new(Inner {
                backend,
                config,
                state: Mutex::new(QueueState::default()),
                changed: Notify::new(),
            }),
        }
    }

    pub fn config(&self) -> QueueConfig {
        self.inner.config
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue one task per source and start as many as the cap allows.
    pub fn enqueue(&self, sources: Vec<UploadSource>, category: Category) -> Vec<TaskId> {
        let ids = {
            let mut state = self.lock();
            sources
                .into_iter()
                .map(|source| {
                    let id = Uuid::new_v4();
                    state.tasks.push(UploadTask {
                        id,
                        source,
                        category,
                        progress: 0,
                        status: TaskStatus::Pending,
                        error: None,
                    });
                    id
                })
                .collect::<Vec<_>>()
        };

        debug!(count = ids.len(), %category, "Queued uploads");
        self.pump();
        ids
    }

    /// Start the oldest pending tasks while slots are free.
    ///
    /// Must be called from within a tokio runtime.
    pub fn pump(&self) {
        let started: Vec<(TaskId, UploadSource, Category)> = {
            let mut state = self.lock();
            let available = self
                .inner
                .config
                .max_concurrent
                .saturating_sub(state.in_flight);

            let started: Vec<_> = state
                .tasks
                .iter_mut()
                .filter(|t| t.status == TaskStatus::Pending)
                .take(available)
                .map(|t| {
                    t.status = TaskStatus::Uploading;
                    t.progress = 0;
                    (t.id, t.source.clone(), t.category)
                })
                .collect();
            state.in_flight += started.len();
            started
        };

        for (id, source, category) in started {
            let queue = self.clone();
            tokio::spawn(async move { queue.transfer(id, source, category).await });
        }
        self.inner.changed.notify_waiters();
    }

    async fn transfer(&self, id: TaskId, source: UploadSource, category: Category) {
        let (tx, mut rx) = mpsc::unbounded_channel::<UploadProgress>();
        let listener = {
            let queue = self.clone();
            tokio::spawn(async move {
                while let Some(progress) = rx.recv().await {
                    queue.set_progress(id, progress.percentage());
                }
            })
        };

        // Own task, so a panicking backend still releases the slot
        let upload = {
            let queue = self.clone();
            tokio::spawn(async move { queue.inner.backend.upload(source, category, tx).await })
        };
        let result = upload.await.unwrap_or_else(|e| {
            Err(DriveApiError {
                kind: DriveApiErrorKind::Request,
                message: "Upload failed".to_string(),
                details: Some(e.to_string()),
                status: None,
            })
        });
        // The sender went with the upload future, so the listener drains and ends
        let _ = listener.await;

        let completed = {
            let mut state = self.lock();
            state.in_flight = state.in_flight.saturating_sub(1);

            let completed = match (state.task_mut(id), result) {
                (None, _) => {
                    debug!(task_id = %id, "Dropping result of cancelled upload");
                    false
                }
                (Some(task), Ok(file)) => {
                    debug!(task_id = %id, file_id = %file.id, "Upload completed");
                    task.status = TaskStatus::Completed;
                    task.progress = 100;
                    task.error = None;
                    true
                }
                (Some(task), Err(e)) => {
                    warn!(task_id = %id, error = %e, details = ?e.details, "Upload failed");
                    task.status = TaskStatus::Error;
                    task.error = Some(e.message);
                    false
                }
            };
            if completed {
                state.reloading += 1;
            }
            completed
        };

        self.pump();

        if completed {
            self.reload_listing(category).await;
            self.lock().reloading -= 1;
            self.schedule_removal(id);
            self.inner.changed.notify_waiters();
        }
    }

    fn set_progress(&self, id: TaskId, progress: u8) {
        let mut state = self.lock();
        if let Some(task) = state.task_mut(id) {
            if task.status == TaskStatus::Uploading {
                task.progress = progress;
            }
        }
    }

    async fn reload_listing(&self, category: Category) {
        match self.inner.backend.list(category).await {
            Ok(files) => {
                self.lock().listings.insert(category, files);
            }
            Err(e) => warn!(%category, error = %e, "Failed to reload file list"),
        }
    }

    fn schedule_removal(&self, id: TaskId) {
        let queue = self.clone();
        let grace = self.inner.config.completed_grace;
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            queue
                .lock()
                .tasks
                .retain(|t| !(t.id == id && t.status == TaskStatus::Completed));
            queue.inner.changed.notify_waiters();
        });
    }

    /// Put a failed task back in line. Returns false unless the task exists
    /// and is in the error state.
    pub fn retry(&self, id: TaskId) -> bool {
        {
            let mut state = self.lock();
            match state.task_mut(id) {
                Some(task) if task.status == TaskStatus::Error => {
                    task.status = TaskStatus::Pending;
                    task.progress = 0;
                    task.error = None;
                }
                _ => return false,
            }
        }
        self.pump();
        true
    }

    /// Remove a task in any state. Returns false when it does not exist.
    pub fn cancel(&self, id: TaskId) -> bool {
        let removed = {
            let mut state = self.lock();
            let before = state.tasks.len();
            state.tasks.retain(|t| t.id != id);
            state.tasks.len() != before
        };
        if removed {
            self.inner.changed.notify_waiters();
        }
        removed
    }

    /// Copy of every task, oldest first.
    pub fn snapshot(&self) -> Vec<UploadTask> {
        self.lock().tasks.clone()
    }

    pub fn task(&self, id: TaskId) -> Option<UploadTask> {
        self.lock().tasks.iter().find(|t| t.id == id).cloned()
    }

    /// File list of a category as last reloaded after an upload.
    pub fn listing(&self, category: Category) -> Option<Vec<RemoteFile>> {
        self.lock().listings.get(&category).cloned()
    }

    /// Transfers currently holding a slot.
    pub fn in_flight(&self) -> usize {
        self.lock().in_flight
    }

    /// Nothing pending and nothing in flight.
    pub fn is_idle(&self) -> bool {
        self.lock().is_idle()
    }

    /// Wait until the queue is idle.
    pub async fn wait_idle(&self) {
        loop {
            let changed = self.inner.changed.notified();
            if self.is_idle() {
                return;
            }
            changed.await;
        }
    }
}
